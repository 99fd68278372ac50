use chrono::{DateTime, Utc};
use outcall_protocol::{Headers, LazyBody};

use crate::adapter::{
    Adapter, BaseRequest, BaseResponse, CallTimes, CapturedRequest, CapturedResponse,
};

/// A libcurl-style transfer handle.
///
/// The handle holds the request as configured by the application and, once performed, the raw
/// response as received. Response headers are only available as the raw header block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transfer {
    /// The target URL.
    pub url: String,
    /// The HTTP method.
    pub method: String,
    /// Request headers in the order they were added. Names may repeat.
    pub headers: Vec<(String, String)>,
    /// The request body.
    pub post_body: Option<Vec<u8>>,
    /// Status code of the response.
    pub response_code: u16,
    /// The raw response header block, including the status line.
    pub header_str: String,
    /// The raw response body. Empty if there was none.
    pub body_str: Vec<u8>,
}

impl Transfer {
    /// Creates a transfer for the given method and URL.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request body.
    pub fn with_post_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.post_body = Some(body.into());
        self
    }
}

/// The request side of a [`Transfer`].
#[derive(Debug)]
pub struct TransferRequest<'a> {
    transfer: &'a Transfer,
    method: String,
    time: DateTime<Utc>,
    body: LazyBody,
}

impl CapturedRequest for TransferRequest<'_> {
    fn url(&self) -> &str {
        &self.transfer.url
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn headers(&self) -> Headers {
        self.transfer.headers.iter().cloned().collect()
    }

    fn body(&self) -> Option<&[u8]> {
        self.transfer.post_body.as_deref()
    }

    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn body_cache(&self) -> &LazyBody {
        &self.body
    }
}

/// The response side of a [`Transfer`].
#[derive(Debug)]
pub struct TransferResponse<'a> {
    transfer: &'a Transfer,
    headers: Headers,
    time: DateTime<Utc>,
    body: LazyBody,
}

impl CapturedResponse for TransferResponse<'_> {
    fn code(&self) -> u16 {
        self.transfer.response_code
    }

    fn headers(&self) -> Headers {
        self.headers.clone()
    }

    fn body(&self) -> Option<&[u8]> {
        let body = &self.transfer.body_str;
        (!body.is_empty()).then_some(body.as_slice())
    }

    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn body_cache(&self) -> &LazyBody {
        &self.body
    }
}

/// Adapter for libcurl-style transfers.
///
/// Response headers are recovered from the raw header block with [`Headers::parse_raw`].
#[derive(Debug)]
pub struct TransferAdapter<'a> {
    transfer: &'a Transfer,
    request: TransferRequest<'a>,
    response: TransferResponse<'a>,
}

impl<'a> TransferAdapter<'a> {
    /// Creates an adapter for a performed transfer.
    pub fn new(transfer: &'a Transfer, times: CallTimes) -> Self {
        Self {
            transfer,
            request: TransferRequest {
                transfer,
                method: transfer.method.to_ascii_uppercase(),
                time: times.request_time,
                body: LazyBody::new(),
            },
            response: TransferResponse {
                transfer,
                headers: Headers::parse_raw(&transfer.header_str),
                time: times.response_time,
                body: LazyBody::new(),
            },
        }
    }
}

impl<'a> Adapter for TransferAdapter<'a> {
    type Request = TransferRequest<'a>;
    type Response = TransferResponse<'a>;

    fn request(&self) -> &Self::Request {
        &self.request
    }

    fn response(&self) -> &Self::Response {
        &self.response
    }

    fn base_request(&self) -> BaseRequest<'_> {
        BaseRequest::Transfer(self.transfer)
    }

    fn base_response(&self) -> BaseResponse<'_> {
        BaseResponse::Transfer(self.transfer)
    }
}
