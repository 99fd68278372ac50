use outcall_protocol::{Event, EventRequest, EventResponse};

use crate::adapter::{Adapter, CapturedRequest, CapturedResponse};

/// Builds the outgoing event of a captured call.
///
/// Bodies are only included if `log_body` is set and the body is present. Otherwise both the body
/// and its transfer encoding are omitted from the event.
pub fn assemble<A: Adapter>(adapter: &A, log_body: bool) -> Event {
    let request = adapter.request();
    let mut event_request = EventRequest::new(
        request.time(),
        request.url(),
        request.method(),
        request.headers(),
    );

    if log_body && let Some(body) = request.decoded_body() {
        event_request.set_body(body);
    }

    let response = adapter.response();
    let mut event_response = EventResponse::new(response.time(), response.code(), response.headers());

    if log_body && let Some(body) = response.decoded_body() {
        event_response.set_body(body);
    }

    Event::outgoing(event_request, event_response)
}
