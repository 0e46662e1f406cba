//! Raw webhook payloads
//!
//! A payload is whatever JSON object the game server posted. Two top-level
//! fields are conventional: `endpoint` (event kind) and `data` (event body).
//! Nothing else about the shape is enforced.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// Endpoint reported when the payload has no usable `endpoint` field
pub const UNKNOWN_ENDPOINT: &str = "unknown";

/// Endpoint used by combat notifications
pub const COMBAT_EVENT_ENDPOINT: &str = "combat/event";

/// Prefix shared by actor-scoped notifications
pub const ACTOR_ENDPOINT_PREFIX: &str = "actor/";

/// One parsed webhook body
///
/// Always a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    /// Parse a raw request body
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    /// Wrap an already parsed document
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(_) => Ok(Self(value)),
            other => Err(PayloadError::NotAnObject(json_kind(&other))),
        }
    }

    /// The `endpoint` string, or `"unknown"` when absent or not a string
    pub fn endpoint(&self) -> &str {
        self.0
            .get("endpoint")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ENDPOINT)
    }

    pub fn endpoint_kind(&self) -> EndpointKind {
        EndpointKind::classify(self.endpoint())
    }

    /// The `data` field as sent, if present
    pub fn data(&self) -> Option<&Value> {
        self.0.get("data")
    }

    /// The `data` field, or an empty object when absent
    pub fn data_or_empty(&self) -> Value {
        self.data()
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// True for `{}`; extractors treat it the same as no payload at all
    pub fn is_empty(&self) -> bool {
        self.0.as_object().map_or(true, Map::is_empty)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Coarse classification of the `endpoint` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// `actor/...`
    ActorUpdate,
    /// `combat/event`
    CombatEvent,
    Other,
}

impl EndpointKind {
    pub fn classify(endpoint: &str) -> Self {
        if endpoint == COMBAT_EVENT_ENDPOINT {
            Self::CombatEvent
        } else if endpoint.starts_with(ACTOR_ENDPOINT_PREFIX) {
            Self::ActorUpdate
        } else {
            Self::Other
        }
    }
}

/// Short name of a JSON value's type, for log and error messages
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
