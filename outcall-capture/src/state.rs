use std::error::Error;
use std::fmt;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, TimeDelta, Utc};
use outcall_protocol::Event;
use outcall_sampling::{ConfigParser, KEEP_ALL, SamplingConfig, default_weight};

use crate::upstream::CollectorApi;

/// Minimum time between two refreshes of the sampling configuration, in seconds.
pub const REFRESH_COOLDOWN_SECS: i64 = 300;

/// The sampling percentage of an event and the configuration it was computed with.
#[derive(Clone, Debug)]
pub struct Evaluation {
    config: Option<Arc<SamplingConfig>>,
    percentage: f64,
}

impl Evaluation {
    /// The percentage of events like this one that should be kept.
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// The weight of the event if it is kept.
    pub fn weight(&self) -> u32 {
        match self.config {
            Some(ref config) => config.rules().weight(self.percentage),
            None => default_weight(self.percentage),
        }
    }

    /// The version of the configuration the event was evaluated with.
    pub fn etag(&self) -> Option<&str> {
        self.config.as_deref().and_then(SamplingConfig::etag)
    }
}

/// Owns the active sampling configuration of a pipeline.
///
/// The configuration is held as an immutable snapshot that is swapped atomically on refresh.
/// Concurrent readers see either the previous or the new configuration, never a mix.
///
/// The check for a refresh and the refresh itself are not synchronized. Two threads may both
/// decide to refresh, which merely fetches the same configuration twice.
pub struct ConfigManager {
    parser: Box<dyn ConfigParser>,
    active: ArcSwapOption<SamplingConfig>,
    last_refresh: ArcSwap<DateTime<Utc>>,
    debug: bool,
}

impl ConfigManager {
    /// Creates a manager without an active configuration.
    pub fn new(parser: Box<dyn ConfigParser>, debug: bool, now: DateTime<Utc>) -> Self {
        Self {
            parser,
            active: ArcSwapOption::empty(),
            last_refresh: ArcSwap::from_pointee(now),
            debug,
        }
    }

    /// Fetches the initial configuration.
    ///
    /// Failures are not fatal. Without a configuration, every event is kept.
    pub fn bootstrap(&self, api: &dyn CollectorApi, now: DateTime<Utc>) {
        if !self.refresh(api, now) {
            stage_debug!(self.debug, "starting without sampling configuration");
        }
    }

    /// Returns the active configuration.
    pub fn snapshot(&self) -> Option<Arc<SamplingConfig>> {
        self.active.load_full()
    }

    /// Returns the version token of the active configuration.
    pub fn etag(&self) -> Option<String> {
        self.active
            .load()
            .as_deref()
            .and_then(SamplingConfig::etag)
            .map(str::to_owned)
    }

    /// Returns the time of the last refresh attempt.
    pub fn last_refresh(&self) -> DateTime<Utc> {
        **self.last_refresh.load()
    }

    /// Evaluates an event against the active configuration.
    ///
    /// The returned [`Evaluation`] holds on to the configuration it was computed with, so its
    /// weight is consistent with its percentage even if a refresh happens in between.
    pub fn evaluate(
        &self,
        event: &Event,
        user_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Evaluation {
        let config = self.snapshot();
        let percentage = match config {
            Some(ref config) => self.sampling_percentage(config, event, user_id, company_id),
            None => KEEP_ALL,
        };

        Evaluation { config, percentage }
    }

    /// Falls back to keeping every event if the rules fail to produce a valid percentage.
    fn sampling_percentage(
        &self,
        config: &SamplingConfig,
        event: &Event,
        user_id: Option<&str>,
        company_id: Option<&str>,
    ) -> f64 {
        match config.rules().sampling_percentage(event, user_id, company_id) {
            Ok(percentage) if (0.0..=KEEP_ALL).contains(&percentage) => percentage,
            Ok(percentage) => {
                stage_debug!(
                    self.debug,
                    percentage,
                    "invalid sampling percentage, keeping event"
                );
                KEEP_ALL
            }
            Err(error) => {
                stage_debug!(
                    self.debug,
                    error = &error as &dyn Error,
                    "failed to compute sampling percentage, keeping event"
                );
                KEEP_ALL
            }
        }
    }

    /// Returns `true` if the reported configuration version warrants a refresh.
    ///
    /// This requires a reported version that differs from the active one, and more than
    /// [`REFRESH_COOLDOWN_SECS`] since the last refresh attempt. Without an active configuration,
    /// every reported version counts as different.
    pub fn should_refresh(&self, reported_etag: Option<&str>, now: DateTime<Utc>) -> bool {
        let Some(reported_etag) = reported_etag else {
            return false;
        };

        if self.etag().as_deref() == Some(reported_etag) {
            return false;
        }

        now - self.last_refresh() > TimeDelta::seconds(REFRESH_COOLDOWN_SECS)
    }

    /// Fetches and activates the current configuration.
    ///
    /// Returns `true` if a new configuration was activated. On failure, the previous
    /// configuration stays active. The attempt counts towards the refresh cooldown either way.
    pub fn refresh(&self, api: &dyn CollectorApi, now: DateTime<Utc>) -> bool {
        self.last_refresh.store(Arc::new(now));

        let raw = match api.get_config() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                stage_debug!(self.debug, "no sampling configuration available");
                return false;
            }
            Err(error) => {
                stage_debug!(
                    self.debug,
                    error = &error as &dyn Error,
                    "failed to fetch sampling configuration"
                );
                return false;
            }
        };

        match self.parser.parse(raw) {
            Ok(config) => {
                stage_debug!(
                    self.debug,
                    etag = ?config.etag(),
                    "activated sampling configuration"
                );
                self.active.store(Some(Arc::new(config)));
                true
            }
            Err(error) => {
                stage_debug!(
                    self.debug,
                    error = &error as &dyn Error,
                    "failed to parse sampling configuration"
                );
                false
            }
        }
    }
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("active", &self.snapshot())
            .field("last_refresh", &self.last_refresh())
            .finish_non_exhaustive()
    }
}
