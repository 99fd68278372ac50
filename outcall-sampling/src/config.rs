//! Sampling configuration and the default rate rules.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use outcall_protocol::Event;
use serde::{Deserialize, Serialize};

use crate::evaluation::default_weight;

/// Sampling percentage that keeps every event.
pub const KEEP_ALL: f64 = 100.0;

/// An error computing a sampling percentage or parsing a configuration.
#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    /// The configuration payload is not valid.
    #[error("invalid sampling configuration")]
    InvalidConfig(#[from] serde_json::Error),
    /// A configured rate is not a percentage.
    #[error("sampling rate {0} is not within [0, 100]")]
    InvalidRate(f64),
}

/// Checks that `rate` is a finite percentage.
fn validate_rate(rate: f64) -> Result<f64, SamplingError> {
    if rate.is_finite() && (0.0..=100.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(SamplingError::InvalidRate(rate))
    }
}

/// A rule set computing how many events to keep.
pub trait SamplingRules: fmt::Debug + Send + Sync {
    /// Returns the percentage of events like `event` that should be kept.
    ///
    /// The identifiers are the user and company of the event after masking.
    fn sampling_percentage(
        &self,
        event: &Event,
        user_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Result<f64, SamplingError>;

    /// Returns the weight of a kept event sampled at `percentage`.
    fn weight(&self, percentage: f64) -> u32 {
        default_weight(percentage)
    }
}

/// Rate based sampling rules as served by the collection API.
///
/// The percentage for an event is the rate of its user if listed, otherwise the rate of its
/// company if listed, otherwise the global `sample_rate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateRules {
    /// Global sampling rate.
    pub sample_rate: f64,
    /// Sampling rates by user id.
    pub user_sample_rate: BTreeMap<String, f64>,
    /// Sampling rates by company id.
    pub company_sample_rate: BTreeMap<String, f64>,
}

impl Default for RateRules {
    fn default() -> Self {
        Self {
            sample_rate: KEEP_ALL,
            user_sample_rate: BTreeMap::new(),
            company_sample_rate: BTreeMap::new(),
        }
    }
}

impl SamplingRules for RateRules {
    fn sampling_percentage(
        &self,
        _event: &Event,
        user_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Result<f64, SamplingError> {
        let user_rate = user_id.and_then(|id| self.user_sample_rate.get(id));
        let company_rate = company_id.and_then(|id| self.company_sample_rate.get(id));

        let rate = user_rate.or(company_rate).unwrap_or(&self.sample_rate);
        validate_rate(*rate)
    }
}

/// A configuration payload as returned by the collection API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawConfig {
    /// The unparsed response body.
    pub body: Vec<u8>,
    /// The version token reported alongside the payload.
    pub etag: Option<String>,
}

/// An immutable snapshot of the active sampling configuration.
///
/// A configuration is only ever replaced as a whole, never updated in place.
#[derive(Clone, Debug)]
pub struct SamplingConfig {
    rules: Arc<dyn SamplingRules>,
    etag: Option<String>,
    fetched_at: DateTime<Utc>,
}

impl SamplingConfig {
    /// Creates a configuration from its parts.
    pub fn new(
        rules: Arc<dyn SamplingRules>,
        etag: Option<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            rules,
            etag,
            fetched_at,
        }
    }

    /// The rule set of this configuration.
    pub fn rules(&self) -> &dyn SamplingRules {
        self.rules.as_ref()
    }

    /// The version token of this configuration.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Time at which this configuration was parsed.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Parses raw configuration payloads into a [`SamplingConfig`].
pub trait ConfigParser: Send + Sync {
    /// Parses the payload into a complete configuration.
    fn parse(&self, raw: RawConfig) -> Result<SamplingConfig, SamplingError>;
}

/// Parses JSON payloads into [`RateRules`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RateRulesParser;

impl ConfigParser for RateRulesParser {
    fn parse(&self, raw: RawConfig) -> Result<SamplingConfig, SamplingError> {
        let rules: RateRules = serde_json::from_slice(&raw.body)?;
        outcall_log::trace!(
            sample_rate = rules.sample_rate,
            users = rules.user_sample_rate.len(),
            companies = rules.company_sample_rate.len(),
            "parsed sampling rules"
        );

        Ok(SamplingConfig::new(Arc::new(rules), raw.etag, Utc::now()))
    }
}
