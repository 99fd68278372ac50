//! A mocked collection API for integration tests.

#![allow(dead_code)]

use httpmock::prelude::*;
use httpmock::Mock;
use outcall::Config;
use serde_json::{Value, json};

pub const APPLICATION_ID: &str = "app-1";

/// Decodes the event posted in `request`.
pub fn posted_event(request: &HttpMockRequest) -> Value {
    request
        .body
        .as_deref()
        .and_then(|body| serde_json::from_slice(body).ok())
        .unwrap_or(Value::Null)
}

/// A collection API running on a local port.
///
/// Requests that match no mock are answered with `404`, so a collector without a configuration
/// mock fails every configuration fetch.
pub struct MiniCollector {
    server: MockServer,
}

impl MiniCollector {
    pub fn new() -> Self {
        Self {
            server: MockServer::start(),
        }
    }

    /// Serves `body` as the sampling configuration with version `etag`.
    pub fn config_mock(&self, body: &str, etag: &str) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method(GET)
                .path("/v1/config")
                .header("x-moesif-application-id", APPLICATION_ID);
            then.status(200)
                .header("X-Moesif-Config-Etag", etag)
                .header("content-type", "application/json")
                .body(body);
        })
    }

    /// Counts configuration fetches that are answered with `404`.
    pub fn missing_config_mock(&self) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method(GET).path("/v1/config");
            then.status(404);
        })
    }

    /// Accepts every event.
    pub fn events_mock(&self) -> Mock<'_> {
        self.events_mock_with(201, None)
    }

    /// Answers every event with `status`, reporting configuration version `etag`.
    pub fn events_mock_with(&self, status: u16, etag: Option<&str>) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method(POST)
                .path("/v1/events")
                .header("x-moesif-application-id", APPLICATION_ID)
                .header("content-type", "application/json");
            let then = then.status(status);
            if let Some(etag) = etag {
                then.header("X-Moesif-Config-Etag", etag);
            }
        })
    }

    /// Accepts events that contain `partial` and pass `check`.
    pub fn events_mock_matching(
        &self,
        partial: Value,
        check: fn(&HttpMockRequest) -> bool,
    ) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method(POST)
                .path("/v1/events")
                .header("x-moesif-application-id", APPLICATION_ID)
                .json_body_partial(partial.to_string())
                .matches(check);
            then.status(201);
        })
    }

    /// Creates a configuration reporting to this collector.
    pub fn config(&self, extra: Value) -> Config {
        let mut values = json!({
            "application_id": APPLICATION_ID,
            "debug": true,
            "collector": {"url": self.server.base_url(), "timeout": 5},
        });

        if let (Some(values), Value::Object(extra)) = (values.as_object_mut(), extra) {
            values.extend(extra);
        }

        Config::from_json_value(values).unwrap()
    }
}
