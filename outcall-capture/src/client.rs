use outcall_config::Config;
use outcall_protocol::Event;
use outcall_sampling::RawConfig;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;

use crate::upstream::{ApiError, CollectorApi, EventReceipt};

/// Header authenticating the application at the collection API.
pub const APPLICATION_ID_HEADER: &str = "X-Moesif-Application-Id";

/// Header carrying the version of the sampling configuration.
pub const CONFIG_ETAG_HEADER: &str = "X-Moesif-Config-Etag";

const EVENTS_PATH: &str = "v1/events";
const CONFIG_PATH: &str = "v1/config";

fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status(status.as_u16()))
    }
}

fn config_etag(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONFIG_ETAG_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Blocking HTTP client for the collection API.
///
/// Requests block the calling thread up to the configured timeouts. The client must not be created
/// or used on a thread that drives an async runtime.
#[derive(Debug)]
pub struct HttpCollector {
    client: Client,
    base_url: String,
    application_id: String,
}

impl HttpCollector {
    /// Creates a client for the collection API configured in `config`.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(config.http_connection_timeout())
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.collector_url().as_str().trim_end_matches('/').to_owned(),
            application_id: config.application_id().to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl CollectorApi for HttpCollector {
    fn create_event(&self, event: &Event) -> Result<EventReceipt, ApiError> {
        let body = serde_json::to_vec(event)?;

        let response = self
            .client
            .post(self.url(EVENTS_PATH))
            .header(APPLICATION_ID_HEADER, &self.application_id)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;

        let response = check_status(response)?;
        Ok(EventReceipt {
            config_etag: config_etag(&response),
        })
    }

    fn get_config(&self) -> Result<Option<RawConfig>, ApiError> {
        let response = self
            .client
            .get(self.url(CONFIG_PATH))
            .header(APPLICATION_ID_HEADER, &self.application_id)
            .send()?;

        let response = check_status(response)?;
        let etag = config_etag(&response);
        let body = response.bytes()?;

        if body.is_empty() {
            return Ok(None);
        }

        Ok(Some(RawConfig {
            body: body.to_vec(),
            etag,
        }))
    }
}
