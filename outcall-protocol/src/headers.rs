use std::fmt;

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use unicase::UniCase;

/// Line terminator of a raw header block.
const CRLF: &str = "\r\n";

/// Separates a header name from its value in a raw header line.
const HEADER_SEPARATOR: char = ':';

/// Separator between the values of a repeated header.
pub const VALUE_SEPARATOR: &str = ", ";

/// Optional whitespace around header values.
fn is_ows(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// A map holding headers.
///
/// Header names are matched case-insensitively. The casing of the first occurrence of a name is
/// kept as the canonical key. Repeated headers accumulate their values in order, which are joined
/// with `", "` when read through [`get`](Self::get) or serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(IndexMap<UniCase<String>, Vec<String>>);

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw header block as returned by libcurl-style clients.
    ///
    /// The block starts with a status line, followed by CRLF-delimited `name: value` lines. The
    /// status line is disregarded, whitespace around values is removed, and lines without a
    /// separator are skipped. Obsolete line folding is not supported.
    ///
    /// # Example
    ///
    /// ```
    /// use outcall_protocol::Headers;
    ///
    /// let headers = Headers::parse_raw("HTTP/1.1 200 OK\r\nVary: Accept\r\nvary: Origin\r\n\r\n");
    /// assert_eq!(headers.get("Vary").as_deref(), Some("Accept, Origin"));
    /// ```
    pub fn parse_raw(block: &str) -> Self {
        let mut headers = Self::new();

        let Some((_, fields)) = block.split_once(CRLF) else {
            return headers;
        };

        for line in fields.split(CRLF) {
            let Some((name, value)) = line.split_once(HEADER_SEPARATOR) else {
                continue;
            };

            if name.is_empty() {
                continue;
            }

            headers.insert(name, value.trim_matches(is_ows));
        }

        headers
    }

    /// Adds a header value, accumulating into an existing header of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0
            .entry(UniCase::new(name.into()))
            .or_default()
            .push(value.into());
    }

    /// Returns the joined value of the header with the given name.
    pub fn get(&self, name: &str) -> Option<String> {
        self.get_all(name).map(|values| values.join(VALUE_SEPARATOR))
    }

    /// Returns all individual values of the header with the given name.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.0
            .get(&UniCase::new(name.to_owned()))
            .map(Vec::as_slice)
    }

    /// Removes the header with the given name and returns its values.
    ///
    /// The order of the remaining headers is preserved.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.shift_remove(&UniCase::new(name.to_owned()))
    }

    /// Returns `true` if a header with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get_all(name).is_some()
    }

    /// Returns the number of distinct header names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over canonical header names and their joined values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.0
            .iter()
            .map(|(name, values)| (name.as_str(), values.join(VALUE_SEPARATOR)))
    }
}

impl From<&http::HeaderMap> for Headers {
    fn from(map: &http::HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of header names to values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut headers = Headers::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    headers.insert(name, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_merge_case_varied_names() {
        let headers = Headers::parse_raw(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\ncontent-type: charset=utf-8\r\n\r\n",
        );

        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.get("CONTENT-TYPE").as_deref(),
            Some("text/plain, charset=utf-8")
        );
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![("Content-Type", "text/plain, charset=utf-8".to_owned())]
        );
    }

    #[test]
    fn test_first_seen_casing_wins() {
        let mut headers = Headers::new();
        headers.insert("x-request-id", "1");
        headers.insert("X-Request-ID", "2");

        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x-request-id"]);
        assert_eq!(headers.get_all("X-REQUEST-ID"), Some(&["1".to_owned(), "2".to_owned()][..]));
    }

    #[test]
    fn test_parse_raw_strips_start_line() {
        let headers = Headers::parse_raw("HTTP/2 404\r\nServer: nginx\r\n");

        assert!(!headers.contains("HTTP/2 404"));
        assert_eq!(headers.get("server").as_deref(), Some("nginx"));
    }

    #[test]
    fn test_parse_raw_trims_values() {
        let headers = Headers::parse_raw("HTTP/1.1 200 OK\r\nX-Foo: \t bar baz \t\r\nX-Empty:\r\n");

        assert_eq!(headers.get("X-Foo").as_deref(), Some("bar baz"));
        assert_eq!(headers.get("X-Empty").as_deref(), Some(""));
    }

    #[test]
    fn test_parse_raw_splits_on_first_separator() {
        let headers = Headers::parse_raw("HTTP/1.1 301\r\nLocation: https://example.com:8443/x\r\n");

        assert_eq!(
            headers.get("location").as_deref(),
            Some("https://example.com:8443/x")
        );
    }

    #[test]
    fn test_parse_raw_skips_malformed_lines() {
        let headers = Headers::parse_raw(
            "HTTP/1.1 200 OK\r\ngarbage line\r\n: no name\r\nX-Ok: yes\r\n\r\n",
        );

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-ok").as_deref(), Some("yes"));
    }

    #[test]
    fn test_parse_raw_without_header_lines() {
        assert!(Headers::parse_raw("").is_empty());
        assert!(Headers::parse_raw("HTTP/1.1 204 No Content").is_empty());
        assert!(Headers::parse_raw("HTTP/1.1 204 No Content\r\n\r\n").is_empty());
    }

    #[test]
    fn test_from_header_map() {
        let mut map = http::HeaderMap::new();
        map.append("accept", HeaderValue::from_static("text/html"));
        map.append("accept", HeaderValue::from_static("application/json"));
        map.insert("x-binary", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let headers = Headers::from(&map);
        assert_eq!(
            headers.get("Accept").as_deref(),
            Some("text/html, application/json")
        );
        assert_eq!(headers.get("x-binary").as_deref(), Some("caf\u{fffd}"));
    }

    #[test]
    fn test_from_pairs() {
        let headers: Headers = [("Accept", "a"), ("X-Foo", "1"), ("accept", "b")]
            .into_iter()
            .collect();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("accept").as_deref(), Some("a, b"));
    }

    #[test]
    fn test_remove() {
        let mut headers: Headers = [("Accept", "a"), ("Authorization", "secret"), ("X-Foo", "1")]
            .into_iter()
            .collect();

        assert_eq!(headers.remove("authorization"), Some(vec!["secret".to_owned()]));
        assert_eq!(headers.remove("authorization"), None);

        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Accept", "X-Foo"]);
    }

    #[test]
    fn test_serialize() {
        let headers: Headers = [("Vary", "Accept"), ("Server", "nginx"), ("vary", "Origin")]
            .into_iter()
            .collect();

        insta::assert_json_snapshot!(headers, @r#"
        {
          "Vary": "Accept, Origin",
          "Server": "nginx"
        }
        "#);
    }

    #[test]
    fn test_deserialize() {
        let headers: Headers =
            serde_json::from_str(r#"{"Content-Type": "application/json"}"#).unwrap();

        assert_eq!(
            headers.get("content-type").as_deref(),
            Some("application/json")
        );
    }
}
