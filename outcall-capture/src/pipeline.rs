use std::error::Error;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use outcall_config::Config;
use outcall_log::LogError;
use outcall_sampling::{ConfigParser, RateRulesParser, SamplingDecision};

use crate::adapter::{Adapter, CallTimes, HttpAdapter, Transfer, TransferAdapter};
use crate::assemble::assemble;
use crate::hooks::{HookError, Hooks};
use crate::state::ConfigManager;
use crate::upstream::CollectorApi;

/// Options of a [`CapturePipeline`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    /// The application id that identifies events at the collection API.
    pub application_id: String,
    /// Enables verbose tracing of every pipeline stage.
    pub debug: bool,
    /// Captures request and response bodies.
    pub log_body: bool,
}

impl PipelineOptions {
    /// Creates options with body capture enabled and tracing disabled.
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            debug: false,
            log_body: true,
        }
    }

    /// Reads the options from the static configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            application_id: config.application_id().to_owned(),
            debug: config.debug(),
            log_body: config.log_body(),
        }
    }
}

/// A pipeline could not be created.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// No application id was configured.
    #[error("application id is required to capture outgoing calls")]
    MissingApplicationId,
}

/// How a capture attempt ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CaptureOutcome {
    /// The call was made to the collection API and ignored.
    SelfEvent,
    /// The skip hook excluded the call.
    Skipped,
    /// The event was dropped by sampling.
    Dropped {
        /// The sampling percentage the event was evaluated at.
        percentage: f64,
    },
    /// The event was sent.
    Sent {
        /// The weight attached to the event.
        weight: u32,
    },
    /// Sending the event failed and it was discarded.
    SendFailed,
}

/// Captures outgoing calls and sends a sample of them to the collection API.
///
/// A pipeline owns its sampling configuration. Independent pipelines do not share any state.
pub struct CapturePipeline {
    options: PipelineOptions,
    hooks: Hooks,
    collector: Arc<dyn CollectorApi>,
    config: ConfigManager,
}

impl CapturePipeline {
    /// Creates a pipeline using the default rate rules.
    ///
    /// This fetches the initial sampling configuration and fails only if the application id is
    /// missing.
    pub fn new(
        options: PipelineOptions,
        hooks: Hooks,
        collector: Arc<dyn CollectorApi>,
    ) -> Result<Self, CaptureError> {
        Self::with_parser(options, hooks, collector, RateRulesParser)
    }

    /// Creates a pipeline parsing sampling configurations with a custom parser.
    pub fn with_parser(
        options: PipelineOptions,
        hooks: Hooks,
        collector: Arc<dyn CollectorApi>,
        parser: impl ConfigParser + 'static,
    ) -> Result<Self, CaptureError> {
        if options.application_id.trim().is_empty() {
            return Err(CaptureError::MissingApplicationId);
        }

        let config = ConfigManager::new(Box::new(parser), options.debug, Utc::now());
        config.bootstrap(collector.as_ref(), Utc::now());

        Ok(Self {
            options,
            hooks,
            collector,
            config,
        })
    }

    /// Returns the options of this pipeline.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Returns the sampling configuration of this pipeline.
    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// Captures a completed call.
    ///
    /// Send and configuration failures are handled internally. Only a failing hook aborts the
    /// capture with an error.
    pub fn capture<A: Adapter>(&self, adapter: &A) -> Result<CaptureOutcome, HookError> {
        let debug = self.options.debug;

        if adapter.is_self_event() {
            stage_debug!(debug, "skipping call to collection api");
            return Ok(CaptureOutcome::SelfEvent);
        }

        let mut event = assemble(adapter, self.options.log_body);
        let request = adapter.base_request();
        let response = adapter.base_response();

        stage_debug!(debug, "running enrichment hooks");
        self.hooks.enrich(&mut event, request, response)?;

        if self.hooks.should_skip(request, response)? {
            stage_debug!(debug, "skipping outgoing call");
            return Ok(CaptureOutcome::Skipped);
        }

        let mut event = self.hooks.mask_event(event)?;

        let evaluation = self.config.evaluate(
            &event,
            event.user_id.as_deref(),
            event.company_id.as_deref(),
        );
        let percentage = evaluation.percentage();

        if SamplingDecision::sample(percentage).is_drop() {
            stage_debug!(debug, percentage, "dropped outgoing event by sampling");
            return Ok(CaptureOutcome::Dropped { percentage });
        }

        let weight = evaluation.weight();
        event.weight = Some(weight);

        stage_debug!(debug, uri = %event.request.uri, weight, "sending outgoing event");
        let receipt = match self.collector.create_event(&event) {
            Ok(receipt) => receipt,
            Err(error) => {
                if error.is_unauthorized() {
                    outcall_log::warn!(
                        "unauthorized access sending event, verify the application id"
                    );
                }
                stage_debug!(
                    debug,
                    error = &error as &dyn Error,
                    "failed to send outgoing event"
                );
                return Ok(CaptureOutcome::SendFailed);
            }
        };

        let now = Utc::now();
        if self.config.should_refresh(receipt.config_etag.as_deref(), now) {
            stage_debug!(debug, "refreshing sampling configuration");
            self.config.refresh(self.collector.as_ref(), now);
        }

        stage_debug!(debug, "sent outgoing event");
        Ok(CaptureOutcome::Sent { weight })
    }

    /// Issues a request through `send` and captures the call.
    ///
    /// The result of `send` is returned unchanged. Failed calls are not captured, and a capture
    /// aborted by a hook is logged.
    pub fn send_http<F, E>(
        &self,
        request: http::Request<Bytes>,
        send: F,
    ) -> Result<http::Response<Bytes>, E>
    where
        F: FnOnce(&http::Request<Bytes>) -> Result<http::Response<Bytes>, E>,
    {
        let (result, times) = CallTimes::measure(|| send(&request));

        if let Ok(ref response) = result {
            self.capture_logged(&HttpAdapter::new(&request, response, times));
        }

        result
    }

    /// Performs a transfer through `perform` and captures the call.
    ///
    /// The result of `perform` is returned unchanged. Failed transfers are not captured, and a
    /// capture aborted by a hook is logged.
    pub fn perform_transfer<F, T, E>(&self, transfer: &mut Transfer, perform: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transfer) -> Result<T, E>,
    {
        let (result, times) = CallTimes::measure(|| perform(transfer));

        if result.is_ok() {
            self.capture_logged(&TransferAdapter::new(transfer, times));
        }

        result
    }

    fn capture_logged<A: Adapter>(&self, adapter: &A) {
        if let Err(error) = self.capture(adapter) {
            outcall_log::warn!("capture of outgoing call aborted: {}", LogError(&error));
        }
    }
}

impl fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("options", &self.options)
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
