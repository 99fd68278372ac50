use outcall_protocol::Event;
use outcall_sampling::RawConfig;

/// An error returned by the collection API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The collection API responded with a non-success status.
    #[error("collection api responded with status {0}")]
    Status(u16),
    /// The request could not be sent or its response could not be read.
    #[error("could not reach collection api")]
    Transport(#[from] reqwest::Error),
    /// The event could not be serialized.
    #[error("failed to encode event")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns `true` if the application id was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(401..=403))
    }
}

/// The result of sending an event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventReceipt {
    /// The version of the sampling configuration known to the collection API.
    pub config_etag: Option<String>,
}

/// The remote collection API.
///
/// Implementations block the calling thread and enforce their own timeouts.
pub trait CollectorApi: Send + Sync {
    /// Sends a single event.
    fn create_event(&self, event: &Event) -> Result<EventReceipt, ApiError>;

    /// Fetches the current sampling configuration.
    ///
    /// Returns `None` if the collection API has no configuration to offer.
    fn get_config(&self) -> Result<Option<RawConfig>, ApiError>;
}
