use data_encoding::BASE64;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The transfer encoding of a captured body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    /// The body is structured JSON and transferred as is.
    #[default]
    None,
    /// The body could not be parsed as JSON and is transferred as base64.
    Base64,
}

impl BodyEncoding {
    /// Returns `true` for [`BodyEncoding::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// A decoded request or response body.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedBody {
    /// The parsed JSON structure, or a base64 string of the raw bytes.
    pub value: Value,
    /// Describes how [`value`](Self::value) has to be interpreted.
    pub encoding: BodyEncoding,
}

impl DecodedBody {
    /// Decodes a raw body.
    ///
    /// Returns `None` if there is no body or the body is empty. Bodies that parse as JSON are kept
    /// as structured data, all other bodies are base64 encoded.
    ///
    /// # Example
    ///
    /// ```
    /// use outcall_protocol::{BodyEncoding, DecodedBody};
    ///
    /// let body = DecodedBody::decode(Some(b"plain text")).unwrap();
    /// assert_eq!(body.encoding, BodyEncoding::Base64);
    /// assert_eq!(body.value, "cGxhaW4gdGV4dA==");
    /// ```
    pub fn decode(raw: Option<&[u8]>) -> Option<Self> {
        let raw = raw.filter(|raw| !raw.is_empty())?;

        Some(match serde_json::from_slice(raw) {
            Ok(value) => Self {
                value,
                encoding: BodyEncoding::None,
            },
            Err(_) => Self {
                value: Value::String(BASE64.encode(raw)),
                encoding: BodyEncoding::Base64,
            },
        })
    }
}

/// Memoizes the decoding of a body.
///
/// Request and response wrappers hold one of these, so that decoding runs at most once per
/// instance regardless of how often the body and its encoding are queried.
#[derive(Debug, Default)]
pub struct LazyBody(OnceCell<Option<DecodedBody>>);

impl LazyBody {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the decoded body, decoding `raw` on first access.
    pub fn get_or_decode(&self, raw: Option<&[u8]>) -> Option<&DecodedBody> {
        self.0.get_or_init(|| DecodedBody::decode(raw)).as_ref()
    }
}
