//! Normalization of native HTTP client calls.
//!
//! Each supported HTTP client gets an [`Adapter`] that exposes its native request and response
//! through the [`CapturedRequest`] and [`CapturedResponse`] traits. Enrichment hooks receive the
//! native objects through [`BaseRequest`] and [`BaseResponse`].

use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use outcall_protocol::{BodyEncoding, DecodedBody, Headers, LazyBody};

mod message;
mod transfer;

pub use self::message::*;
pub use self::transfer::*;

/// Marks URLs that belong to the collection API.
pub const SELF_EVENT_MARKER: &str = "moesif";

/// Returns `true` if `url` points to the collection API.
///
/// The check is a case-insensitive substring test for [`SELF_EVENT_MARKER`].
pub fn is_self_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains(SELF_EVENT_MARKER)
}

/// Returns the current time truncated to milliseconds.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Wall clock times taken around a native call.
///
/// These are the authoritative timestamps of an event, independent of any time information the
/// native objects may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallTimes {
    /// Time right before the call was issued.
    pub request_time: DateTime<Utc>,
    /// Time right after the call returned.
    pub response_time: DateTime<Utc>,
}

impl CallTimes {
    /// Runs `call` and records the times around it.
    pub fn measure<T>(call: impl FnOnce() -> T) -> (T, Self) {
        let request_time = now();
        let result = call();
        let response_time = now();

        let times = Self {
            request_time,
            response_time,
        };

        (result, times)
    }
}

/// A native request as handed to enrichment hooks.
#[derive(Clone, Copy, Debug)]
pub enum BaseRequest<'a> {
    /// A request of a client built on the `http` crate.
    Http(&'a http::Request<Bytes>),
    /// A libcurl-style transfer.
    Transfer(&'a Transfer),
}

/// A native response as handed to enrichment hooks.
#[derive(Clone, Copy, Debug)]
pub enum BaseResponse<'a> {
    /// A response of a client built on the `http` crate.
    Http(&'a http::Response<Bytes>),
    /// A libcurl-style transfer after it was performed.
    Transfer(&'a Transfer),
}

/// The request side of a captured call.
pub trait CapturedRequest {
    /// The full target URL.
    fn url(&self) -> &str;

    /// The upper-case HTTP method.
    fn method(&self) -> &str;

    /// The request headers.
    fn headers(&self) -> Headers;

    /// The raw request body, if any.
    fn body(&self) -> Option<&[u8]>;

    /// Time the request was issued.
    fn time(&self) -> DateTime<Utc>;

    /// Cache for [`decoded_body`](Self::decoded_body).
    fn body_cache(&self) -> &LazyBody;

    /// Returns `true` if there is a non-empty body.
    fn has_body(&self) -> bool {
        self.decoded_body().is_some()
    }

    /// Returns the decoded body, decoding it at most once.
    fn decoded_body(&self) -> Option<&DecodedBody> {
        self.body_cache().get_or_decode(self.body())
    }

    /// Returns the encoding of the decoded body.
    fn body_encoding(&self) -> Option<BodyEncoding> {
        self.decoded_body().map(|body| body.encoding)
    }
}

/// The response side of a captured call.
pub trait CapturedResponse {
    /// The HTTP status code.
    fn code(&self) -> u16;

    /// The response headers.
    fn headers(&self) -> Headers;

    /// The raw response body, if any.
    fn body(&self) -> Option<&[u8]>;

    /// Time the response was received.
    fn time(&self) -> DateTime<Utc>;

    /// Cache for [`decoded_body`](Self::decoded_body).
    fn body_cache(&self) -> &LazyBody;

    /// Returns `true` if there is a non-empty body.
    fn has_body(&self) -> bool {
        self.decoded_body().is_some()
    }

    /// Returns the decoded body, decoding it at most once.
    fn decoded_body(&self) -> Option<&DecodedBody> {
        self.body_cache().get_or_decode(self.body())
    }

    /// Returns the encoding of the decoded body.
    fn body_encoding(&self) -> Option<BodyEncoding> {
        self.decoded_body().map(|body| body.encoding)
    }
}

/// A captured call of one HTTP client.
pub trait Adapter {
    /// The normalized request.
    type Request: CapturedRequest;
    /// The normalized response.
    type Response: CapturedResponse;

    /// Returns the normalized request.
    fn request(&self) -> &Self::Request;

    /// Returns the normalized response.
    fn response(&self) -> &Self::Response;

    /// Returns the native request for enrichment hooks.
    fn base_request(&self) -> BaseRequest<'_>;

    /// Returns the native response for enrichment hooks.
    fn base_response(&self) -> BaseResponse<'_>;

    /// Returns `true` if the call was made to the collection API itself.
    fn is_self_event(&self) -> bool {
        is_self_url(self.request().url())
    }
}
