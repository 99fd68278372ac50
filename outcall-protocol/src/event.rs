use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BodyEncoding, DecodedBody, Headers};

/// Serializes timestamps as ISO-8601 in UTC with millisecond precision.
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&string)
            .map(|time| time.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}

/// Returns the transfer encoding to report for a decoded body.
///
/// Structured JSON bodies carry no transfer encoding on the wire.
fn transfer_encoding(body: &DecodedBody) -> Option<BodyEncoding> {
    (!body.encoding.is_none()).then_some(body.encoding)
}

/// The direction of a captured call relative to the instrumented application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// A call received by the application.
    Incoming,
    /// A call made by the application to another service.
    Outgoing,
}

/// The request part of an [`Event`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Time the request was issued.
    #[serde(with = "timestamp")]
    pub time: DateTime<Utc>,
    /// The full target URL.
    pub uri: String,
    /// The upper-case HTTP method.
    pub verb: String,
    /// Request headers.
    pub headers: Headers,
    /// Version of the called API, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Address of the caller, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// The decoded request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Set if [`body`](Self::body) is not structured JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_encoding: Option<BodyEncoding>,
}

impl EventRequest {
    /// Creates a request without body.
    pub fn new(
        time: DateTime<Utc>,
        uri: impl Into<String>,
        verb: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self {
            time,
            uri: uri.into(),
            verb: verb.into(),
            headers,
            api_version: None,
            ip_address: None,
            body: None,
            transfer_encoding: None,
        }
    }

    /// Attaches a decoded body along with its transfer encoding.
    pub fn set_body(&mut self, body: &DecodedBody) {
        self.body = Some(body.value.clone());
        self.transfer_encoding = transfer_encoding(body);
    }
}

/// The response part of an [`Event`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Time the response was received.
    #[serde(with = "timestamp")]
    pub time: DateTime<Utc>,
    /// The HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Address of the responding server, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// The decoded response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Set if [`body`](Self::body) is not structured JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_encoding: Option<BodyEncoding>,
}

impl EventResponse {
    /// Creates a response without body.
    pub fn new(time: DateTime<Utc>, status: u16, headers: Headers) -> Self {
        Self {
            time,
            status,
            headers,
            ip_address: None,
            body: None,
            transfer_encoding: None,
        }
    }

    /// Attaches a decoded body along with its transfer encoding.
    pub fn set_body(&mut self, body: &DecodedBody) {
        self.body = Some(body.value.clone());
        self.transfer_encoding = transfer_encoding(body);
    }
}

/// One captured HTTP call as transmitted to the collection API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The request as issued.
    pub request: EventRequest,
    /// The response as received.
    pub response: EventResponse,
    /// Whether the call was made or received by the application.
    pub direction: Direction,
    /// Arbitrary data attached by the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// The user on whose behalf the call was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// The company on whose behalf the call was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    /// The session the call belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Number of calls this event stands for after sampling.
    ///
    /// Only set on events that are actually sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl Event {
    /// Creates an event for a call made by the application.
    pub fn outgoing(request: EventRequest, response: EventResponse) -> Self {
        Self {
            request,
            response,
            direction: Direction::Outgoing,
            metadata: None,
            user_id: None,
            company_id: None,
            session_token: None,
            weight: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn time(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + millis).unwrap()
    }

    fn event() -> Event {
        let headers: Headers = [("Accept", "application/json")].into_iter().collect();
        let request = EventRequest::new(time(0), "https://api.example.com/items", "GET", headers);
        let response = EventResponse::new(time(42), 200, Headers::new());
        Event::outgoing(request, response)
    }

    #[test]
    fn test_serialize_minimal() {
        insta::assert_json_snapshot!(event(), @r#"
        {
          "request": {
            "time": "2023-11-14T22:13:20.000Z",
            "uri": "https://api.example.com/items",
            "verb": "GET",
            "headers": {
              "Accept": "application/json"
            }
          },
          "response": {
            "time": "2023-11-14T22:13:20.042Z",
            "status": 200,
            "headers": {}
          },
          "direction": "Outgoing"
        }
        "#);
    }

    #[test]
    fn test_serialize_enriched() {
        let mut event = event();
        event
            .request
            .set_body(&DecodedBody::decode(Some(b"hello")).unwrap());
        event
            .response
            .set_body(&DecodedBody::decode(Some(br#"{"id": 1}"#)).unwrap());
        event.metadata = Some(json!({"team": "billing"}));
        event.user_id = Some("user-1".to_owned());
        event.company_id = Some("company-1".to_owned());
        event.session_token = Some("token".to_owned());
        event.weight = Some(4);

        insta::assert_json_snapshot!(event, @r#"
        {
          "request": {
            "time": "2023-11-14T22:13:20.000Z",
            "uri": "https://api.example.com/items",
            "verb": "GET",
            "headers": {
              "Accept": "application/json"
            },
            "body": "aGVsbG8=",
            "transfer_encoding": "base64"
          },
          "response": {
            "time": "2023-11-14T22:13:20.042Z",
            "status": 200,
            "headers": {},
            "body": {
              "id": 1
            }
          },
          "direction": "Outgoing",
          "metadata": {
            "team": "billing"
          },
          "user_id": "user-1",
          "company_id": "company-1",
          "session_token": "token",
          "weight": 4
        }
        "#);
    }

    #[test]
    fn test_timestamp_truncates_to_millis() {
        let time = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let response = EventResponse::new(time, 204, Headers::new());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["time"], "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn test_deserialize_timestamp() {
        let request: EventRequest = serde_json::from_value(json!({
            "time": "2023-11-14T22:13:20.042Z",
            "uri": "https://api.example.com",
            "verb": "POST",
            "headers": {}
        }))
        .unwrap();

        assert_eq!(request.time, time(42));
        assert_eq!(request.body, None);
    }
}
