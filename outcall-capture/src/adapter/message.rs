use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::HOST;
use outcall_protocol::{Headers, LazyBody};

use crate::adapter::{
    Adapter, BaseRequest, BaseResponse, CallTimes, CapturedRequest, CapturedResponse,
};

/// Resolves the full URL of a request.
///
/// Clients may hold the target in origin form, in which case the URL is rebuilt from the `Host`
/// header assuming TLS.
fn absolute_url(request: &http::Request<Bytes>) -> String {
    let uri = request.uri();
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.to_string();
    }

    let path = uri.path_and_query().map_or("/", |path| path.as_str());
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok());

    match host {
        Some(host) => format!("https://{host}{path}"),
        None => path.to_owned(),
    }
}

fn non_empty(body: &Bytes) -> Option<&[u8]> {
    (!body.is_empty()).then_some(body.as_ref())
}

/// A request of a client built on the `http` crate.
#[derive(Debug)]
pub struct HttpRequest<'a> {
    inner: &'a http::Request<Bytes>,
    url: String,
    method: String,
    time: DateTime<Utc>,
    body: LazyBody,
}

impl<'a> HttpRequest<'a> {
    /// Wraps a native request issued at `time`.
    pub fn new(inner: &'a http::Request<Bytes>, time: DateTime<Utc>) -> Self {
        Self {
            inner,
            url: absolute_url(inner),
            method: inner.method().as_str().to_ascii_uppercase(),
            time,
            body: LazyBody::new(),
        }
    }

    /// Returns the native request.
    pub fn inner(&self) -> &'a http::Request<Bytes> {
        self.inner
    }
}

impl CapturedRequest for HttpRequest<'_> {
    fn url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn headers(&self) -> Headers {
        Headers::from(self.inner.headers())
    }

    fn body(&self) -> Option<&[u8]> {
        non_empty(self.inner.body())
    }

    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn body_cache(&self) -> &LazyBody {
        &self.body
    }
}

/// A response of a client built on the `http` crate.
#[derive(Debug)]
pub struct HttpResponse<'a> {
    inner: &'a http::Response<Bytes>,
    time: DateTime<Utc>,
    body: LazyBody,
}

impl<'a> HttpResponse<'a> {
    /// Wraps a native response received at `time`.
    pub fn new(inner: &'a http::Response<Bytes>, time: DateTime<Utc>) -> Self {
        Self {
            inner,
            time,
            body: LazyBody::new(),
        }
    }

    /// Returns the native response.
    pub fn inner(&self) -> &'a http::Response<Bytes> {
        self.inner
    }
}

impl CapturedResponse for HttpResponse<'_> {
    fn code(&self) -> u16 {
        self.inner.status().as_u16()
    }

    fn headers(&self) -> Headers {
        Headers::from(self.inner.headers())
    }

    fn body(&self) -> Option<&[u8]> {
        non_empty(self.inner.body())
    }

    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn body_cache(&self) -> &LazyBody {
        &self.body
    }
}

/// Adapter for clients that expose requests and responses of the `http` crate.
///
/// Headers and bodies are read directly from the native objects.
#[derive(Debug)]
pub struct HttpAdapter<'a> {
    request: HttpRequest<'a>,
    response: HttpResponse<'a>,
}

impl<'a> HttpAdapter<'a> {
    /// Creates an adapter for a completed call.
    pub fn new(
        request: &'a http::Request<Bytes>,
        response: &'a http::Response<Bytes>,
        times: CallTimes,
    ) -> Self {
        Self {
            request: HttpRequest::new(request, times.request_time),
            response: HttpResponse::new(response, times.response_time),
        }
    }
}

impl<'a> Adapter for HttpAdapter<'a> {
    type Request = HttpRequest<'a>;
    type Response = HttpResponse<'a>;

    fn request(&self) -> &Self::Request {
        &self.request
    }

    fn response(&self) -> &Self::Response {
        &self.response
    }

    fn base_request(&self) -> BaseRequest<'_> {
        BaseRequest::Http(self.request.inner)
    }

    fn base_response(&self) -> BaseResponse<'_> {
        BaseResponse::Http(self.response.inner)
    }
}
