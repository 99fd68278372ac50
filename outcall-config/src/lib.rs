//! Configuration for outcall.
//!
//! The configuration is loaded from a `config.yml` file within a configuration folder, or built
//! directly from YAML or JSON for embedding. Values can then be overridden from the environment
//! through [`OverridableConfig`]. Loading validates the configuration, in particular the presence
//! of an application id, so that a misconfigured capture pipeline fails at start-up rather than on
//! the first instrumented call.
#![warn(missing_docs)]

mod config;

pub use self::config::*;
