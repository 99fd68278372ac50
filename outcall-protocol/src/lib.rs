//! Canonical representation of a captured outgoing HTTP call.
//!
//! Every instrumented HTTP client is normalized into the same shape before it is enriched, sampled
//! and sent to the collection API:
//!
//!  - [`Headers`]: a case-insensitive, multi-value-aware header map. It can be built from a native
//!    [`http::HeaderMap`], from a list of pairs, or parsed from a raw header block with
//!    [`Headers::parse_raw`].
//!  - [`DecodedBody`]: the result of decoding a raw body. Valid JSON is kept as structured data,
//!    everything else is transferred as base64.
//!  - [`Event`]: the transmitted representation of one call, composed of an [`EventRequest`] and an
//!    [`EventResponse`].
#![warn(missing_docs)]

mod body;
mod event;
mod headers;

pub use self::body::*;
pub use self::event::*;
pub use self::headers::*;
