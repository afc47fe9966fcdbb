use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const STORED_FIELD: &str = "stored";

/// Identifier assigned to a highlight by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HighlightId {
    Int(i64),
    /// Integers above `i64::MAX`.
    Unsigned(u64),
    Text(String),
}

impl HighlightId {
    /// Reads an id out of a JSON value. Floats, booleans, blank strings and
    /// containers are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number
                .as_i64()
                .map(HighlightId::Int)
                .or_else(|| number.as_u64().map(HighlightId::Unsigned)),
            Value::String(text) if !text.trim().is_empty() => {
                Some(HighlightId::Text(text.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for HighlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighlightId::Int(id) => write!(f, "{}", id),
            HighlightId::Unsigned(id) => write!(f, "{}", id),
            HighlightId::Text(id) => f.write_str(id),
        }
    }
}

/// A highlight exactly as the service sent it. The schema is only partially
/// known, so the record is kept as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawHighlight(Map<String, Value>);

impl RawHighlight {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn id(&self) -> Option<HighlightId> {
        self.0.get("id").and_then(HighlightId::from_value)
    }
}

impl From<Map<String, Value>> for RawHighlight {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Top-level object of the analysis response.
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightEnvelope {
    pub highlights: Vec<RawHighlight>,
}

/// Highlight normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiHighlight {
    pub id: HighlightId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// Highlight in the shape persisted to history: the raw fields plus the
/// `stored` marker, serialized flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageHighlight {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub stored: bool,
}

impl StorageHighlight {
    pub fn id(&self) -> Option<HighlightId> {
        self.fields.get("id").and_then(HighlightId::from_value)
    }

    pub fn title(&self) -> Option<&str> {
        self.fields
            .get("title")
            .or_else(|| self.fields.get("name"))
            .and_then(Value::as_str)
    }
}
