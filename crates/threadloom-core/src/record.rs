//! Comment records as they arrive from the data source.
//!
//! `RawComment` is the wire shape (lenient field names, raw parent value).
//! `CommentRecord` is the ingested shape the builder consumes, with the parent
//! pointer already classified into a [`ParentRef`].

use std::fmt;

use chrono::{DateTime, SecondsFormat};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Fields of a comment the engine never interprets (author, text, likes...).
pub type Payload = Map<String, Value>;

/// A parent pointer, classified once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ParentRef {
    /// No parent: the comment is top-level.
    #[default]
    None,
    /// A clean identifier. After building, also an input id matched verbatim.
    Id(String),
    /// Text that should have been an identifier but was serialized as the
    /// printed form of some object (`ObjectId("…")`, a JSON fragment...).
    Malformed(String),
}

impl ParentRef {
    pub fn is_none(&self) -> bool {
        matches!(self, ParentRef::None)
    }

    /// Returns the identifier if the reference is already clean.
    pub fn as_id(&self) -> Option<&str> {
        match self {
            ParentRef::Id(id) => Some(id),
            ParentRef::None | ParentRef::Malformed(_) => None,
        }
    }

    /// Returns the declared text, clean or not.
    pub fn declared(&self) -> Option<&str> {
        match self {
            ParentRef::None => None,
            ParentRef::Id(text) | ParentRef::Malformed(text) => Some(text),
        }
    }
}

impl From<Option<String>> for ParentRef {
    fn from(value: Option<String>) -> Self {
        value.map_or(ParentRef::None, ParentRef::Id)
    }
}

/// Serializes as `null` or the plain string, matching the wire shape callers
/// sent in.
impl Serialize for ParentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.declared() {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_none(),
        }
    }
}

/// Creation time in Unix milliseconds.
///
/// Accepted on the wire as an integer or an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Parses an RFC 3339 string or a string of decimal milliseconds.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(millis) = text.parse::<i64>() {
            return Some(Self(millis));
        }
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| Self(dt.timestamp_millis()))
    }

    /// Formats as an RFC 3339 UTC string, or `None` if out of chrono's range.
    pub fn to_rfc3339(self) -> Option<String> {
        DateTime::from_timestamp_millis(self.0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Timestamp)
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {n}"))),
            Value::String(s) => Timestamp::parse(&s)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {s:?}"))),
            other => Err(de::Error::custom(format!(
                "expected timestamp number or string, got {other}"
            ))),
        }
    }
}

/// Wire names for the parent pointer, highest priority first.
pub const PARENT_FIELDS: &[&str] = &[
    "parentRef",
    "parent_ref",
    "parent",
    "parentId",
    "parent_id",
    "replyTo",
];

/// A comment exactly as the data source sent it.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "WireComment")]
pub struct RawComment {
    pub id: String,
    /// First non-null value among [`PARENT_FIELDS`]; `null` when none is set.
    pub parent_ref: Value,
    pub created_at: Timestamp,
    /// Every other field, minus all parent aliases.
    pub payload: Payload,
}

#[derive(Deserialize)]
struct WireComment {
    #[serde(deserialize_with = "id_from_string_or_number")]
    id: String,

    #[serde(
        rename = "createdAt",
        alias = "created_at",
        alias = "created",
        alias = "t"
    )]
    created_at: Timestamp,

    #[serde(flatten)]
    fields: Payload,
}

impl From<WireComment> for RawComment {
    fn from(wire: WireComment) -> Self {
        let mut payload = wire.fields;
        let mut parent_ref = Value::Null;
        for name in PARENT_FIELDS {
            if let Some(value) = payload.remove(*name)
                && parent_ref.is_null()
            {
                parent_ref = value;
            }
        }

        Self {
            id: wire.id,
            parent_ref,
            created_at: wire.created_at,
            payload,
        }
    }
}

fn id_from_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// A comment ready for threading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    pub parent_ref: ParentRef,
    pub created_at: Timestamp,
    pub payload: Payload,
}

impl CommentRecord {
    pub fn new(id: impl Into<String>, parent_ref: ParentRef, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            parent_ref,
            created_at,
            payload: Payload::new(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Returns the `author` payload field when it is a string.
    pub fn author(&self) -> Option<&str> {
        self.payload.get("author").and_then(Value::as_str)
    }
}
