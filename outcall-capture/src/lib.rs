//! Capture pipeline for outgoing HTTP calls.
//!
//! The host application routes its HTTP calls through one of the interception points
//! [`send_http`] or [`perform_transfer`]. After the real call returns, the call is wrapped in an
//! [`Adapter`] and handed to the [`CapturePipeline`], which
//!
//!  1. ignores calls to the collection API itself,
//!  2. assembles an [`Event`](outcall_protocol::Event) from the adapter,
//!  3. runs the enrichment [`Hooks`] and the optional skip and mask hooks,
//!  4. makes a sampling decision against the active sampling configuration,
//!  5. sends the event through the [`CollectorApi`], and
//!  6. refreshes the sampling configuration if the collection API reports a newer version.
//!
//! All of this runs synchronously on the thread that issued the call. Apart from enrichment hook
//! failures, nothing in the pipeline affects the result of the instrumented call.

#![warn(missing_docs)]

/// Emits a debug message if verbose pipeline tracing is enabled.
macro_rules! stage_debug {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            outcall_log::debug!($($arg)+);
        }
    };
}

mod adapter;
mod assemble;
mod client;
mod hooks;
mod pipeline;
mod state;
mod upstream;

#[cfg(test)]
mod testutils;

pub use self::adapter::*;
pub use self::assemble::*;
pub use self::client::*;
pub use self::hooks::*;
pub use self::pipeline::*;
pub use self::state::*;
pub use self::upstream::*;
