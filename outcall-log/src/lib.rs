//! Logging facade for outcall.
//!
//! # Setup
//!
//! With the `init` feature, invoke the `init` function with a `LogConfig` to enable logging. The
//! configuration implements `serde` traits, so it can be obtained from configuration files. Since
//! outcall runs inside a host application, calling `init` is optional: if the host already
//! installed a `tracing` subscriber, all messages flow into that subscriber instead.
//!
//! # Logging
//!
//! The basic use of this crate is through the five logging macros: [`error!`], [`warn!`],
//! [`info!`], [`debug!`] and [`trace!`] where `error!` represents the highest-priority log messages
//! and `trace!` the lowest. Each of these macros accept format strings similarly to [`println!`].
//!
//! ## Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer short and precise log
//! messages over verbose text. Choose the log level according to these rules:
//!
//! - [`error!`] for bugs and invalid behavior.
//! - [`warn!`] for undesirable behavior the user has to act on, such as a rejected application id.
//! - [`info!`] for messages relevant to the average user.
//! - [`debug!`] for messages usually relevant to debugging, such as pipeline stages.
//! - [`trace!`] for full auxiliary information.
//!
//! ## Logging Error Types
//!
//! To log errors with all their causes, use the [`LogError`] wrapper.
//!
//! ```
//! use std::io::{Error, ErrorKind};
//! use outcall_log::LogError;
//!
//! let custom_error = Error::new(ErrorKind::Other, "oh no!");
//! outcall_log::error!("operation failed: {}", LogError(&custom_error));
//! ```
//!
//! # Testing
//!
//! For unit testing, the `test` feature provides a separate initialization macro `init_test!` that
//! should be called at the beginning of test method. It enables test mode of the logger and
//! customizes log levels for the current crate.

#![warn(missing_docs)]

#[cfg(feature = "init")]
mod setup;
#[cfg(feature = "init")]
pub use setup::*;

#[cfg(feature = "test")]
pub use test::*;

mod utils;
pub use utils::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};
