//! Captures outgoing HTTP calls of an application and reports a sample of them to a collection
//! API.
//!
//! # Usage
//!
//! Load a [`Config`], optionally initialize logging, and [`start`] a pipeline. Calls issued through
//! [`CapturePipeline::send_http`] or [`CapturePipeline::perform_transfer`] are then captured after
//! they complete:
//!
//! ```no_run
//! use outcall::{Config, Hooks};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::from_yaml_str("application_id: my-app")?;
//! outcall::init_logging(&config);
//!
//! let hooks = Hooks::new().identify_user(|_request, _response| Ok(Some("user-1".to_owned())));
//! let pipeline = outcall::start(&config, hooks)?;
//! # let _ = pipeline;
//! # Ok(())
//! # }
//! ```
//!
//! # Workspace Crates
//!
//!  - `outcall`: Entry point re-exporting the public API.
//!  - [`outcall-capture`]: Adapters, event assembly and the capture pipeline.
//!  - [`outcall-config`]: Static configuration.
//!  - [`outcall-log`]: Logging facade.
//!  - [`outcall-protocol`]: Headers, bodies and the event wire format.
//!  - [`outcall-sampling`]: Sampling rules and decisions.
//!
//! [`outcall-capture`]: outcall_capture
//! [`outcall-config`]: outcall_config
//! [`outcall-log`]: outcall_log
//! [`outcall-protocol`]: outcall_protocol
//! [`outcall-sampling`]: outcall_sampling

#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::{Context, Result};

mod setup;

pub use outcall_capture::*;
pub use outcall_config::{Config, ConfigError, ConfigErrorKind, OverridableConfig};
pub use outcall_protocol::*;
pub use outcall_sampling::*;

/// Installs the logger configured in `config`.
///
/// This is optional. Without it, messages are routed to the subscriber of the host application.
pub fn init_logging(config: &Config) {
    outcall_log::init(config.logging());
}

/// Creates a capture pipeline reporting to the collection API configured in `config`.
///
/// This fetches the initial sampling configuration from the collection API. A failed fetch is not
/// fatal, in which case every event is kept until a configuration becomes available.
pub fn start(config: &Config, hooks: Hooks) -> Result<CapturePipeline> {
    setup::check_config(config)?;
    setup::dump_start_infos(config);

    let collector =
        HttpCollector::new(config).context("failed to create collection api client")?;

    let pipeline = CapturePipeline::new(
        PipelineOptions::from_config(config),
        hooks,
        Arc::new(collector),
    )?;

    match pipeline.config().etag() {
        Some(etag) => outcall_log::info!("capture started with sampling configuration {etag}"),
        None => outcall_log::info!("capture started"),
    }

    Ok(pipeline)
}
