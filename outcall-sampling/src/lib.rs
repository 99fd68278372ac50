//! Sampling logic for captured outgoing HTTP calls.
//!
//! Not every captured call is sent to the collection API. What share of calls is kept is
//! controlled by a [`SamplingConfig`] that is fetched from the collection API and refreshed when
//! the API reports a newer version of it.
//!
//! # Components
//!
//! - [`SamplingRules`]: the strategy computing a sampling percentage for an event. The rules are
//!   opaque to the capture pipeline; [`RateRules`] is the default implementation.
//! - [`ConfigParser`]: turns a [`RawConfig`] payload into a [`SamplingConfig`].
//! - [`SamplingDecision`]: the outcome of comparing a percentage with a fresh [`random_draw`].
//!
//! # How It Works
//!
//! For every event, the rules produce a percentage in `[0, 100]`. A uniform random value is drawn
//! from `[0, 100)` and the event is kept if the percentage is strictly greater than the draw. Kept
//! events carry a weight, the inverse sampling ratio computed by [`SamplingRules::weight`], so that
//! downstream aggregation can extrapolate the true call volume.

#![warn(missing_docs)]

mod config;
mod evaluation;

pub use config::*;
pub use evaluation::*;
