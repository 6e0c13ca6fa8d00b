//! Parent reference normalization.
//!
//! Upstream producers sometimes serialize a parent pointer as the printed form
//! of an internal object (`ObjectId("…")`, a JSON fragment) instead of the plain
//! identifier. Everything here is total: a reference that cannot be recovered
//! comes back as `None` and the comment is threaded as a root.
//!
//! A *clean identifier* is non-empty and has no whitespace, quotes,
//! parentheses, braces, or brackets. Extraction patterns only ever capture
//! clean identifiers, so `normalize(normalize(x)) == normalize(x)`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::record::{CommentRecord, ParentRef, RawComment};

/// Field names that carry an identifier inside nested parent objects and
/// serialized JSON fragments.
pub const DEFAULT_ID_FIELDS: &[&str] = &["id", "_id", "$oid"];

/// Nesting limit for objects like `{"_id": {"$oid": "…"}}`.
const MAX_OBJECT_DEPTH: usize = 4;

/// Character class of a clean identifier, without the brackets.
const IDENT_CHARS: &str = r#"[^\s"'(){}\[\]]"#;

fn is_clean_identifier(text: &str) -> bool {
    !text.is_empty()
        && !text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | '{' | '}' | '[' | ']'))
}

/// `ObjectId("c1")`, `new ObjectId('c1')`, `Ref( "c1" )`.
fn constructor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r#"[A-Za-z_$][\w$.]*\s*\(\s*["']({IDENT_CHARS}+)["']\s*\)"#
        ))
        .expect("constructor pattern is valid")
    })
}

/// `"id": "c1"`, `_id: 'c1'`, `"id":42` for the given field names.
fn fragment_pattern(id_fields: &[String]) -> Option<Regex> {
    if id_fields.is_empty() {
        return None;
    }
    let fields = id_fields
        .iter()
        .map(|f| regex::escape(f))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r#"(?:^|[^\w$])["']?(?:{fields})["']?\s*:\s*["']?({IDENT_CHARS}+?)["']?\s*(?:[,}}]|$)"#
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(%err, "id field names produce an invalid fragment pattern; fragment recovery disabled");
            None
        }
    }
}

/// Turns raw parent references into clean identifiers.
///
/// Immutable after construction; share one per configuration.
#[derive(Debug, Clone)]
pub struct Normalizer {
    id_fields: Vec<String>,
    fragment: Option<Regex>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ID_FIELDS.iter().map(ToString::to_string))
    }
}

impl Normalizer {
    pub fn new<I, S>(id_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id_fields: Vec<String> = id_fields
            .into_iter()
            .map(Into::into)
            .filter(|f| !f.trim().is_empty())
            .collect();
        let fragment = fragment_pattern(&id_fields);
        Self {
            id_fields,
            fragment,
        }
    }

    /// Process-wide normalizer with the default id fields.
    pub fn shared() -> &'static Normalizer {
        static SHARED: OnceLock<Normalizer> = OnceLock::new();
        SHARED.get_or_init(Normalizer::default)
    }

    pub fn id_fields(&self) -> &[String] {
        &self.id_fields
    }

    /// Classifies a raw wire value without attempting recovery.
    pub fn classify(&self, raw: &Value) -> ParentRef {
        match raw {
            Value::Null | Value::Bool(_) | Value::Array(_) => ParentRef::None,
            Value::Number(n) => ParentRef::Id(n.to_string()),
            Value::String(s) => classify_str(s),
            Value::Object(map) => self.object_id(map, 0).into(),
        }
    }

    /// Resolves a classified reference to a clean identifier.
    pub fn resolve(&self, parent: &ParentRef) -> Option<String> {
        match parent {
            ParentRef::None => None,
            ParentRef::Id(id) => Some(id.clone()),
            ParentRef::Malformed(text) => self.extract(text),
        }
    }

    /// `resolve(classify(raw))`.
    pub fn normalize(&self, raw: &Value) -> Option<String> {
        self.resolve(&self.classify(raw))
    }

    /// Converts a wire comment into a record with a classified parent.
    pub fn ingest(&self, raw: RawComment) -> CommentRecord {
        CommentRecord {
            parent_ref: self.classify(&raw.parent_ref),
            id: raw.id,
            created_at: raw.created_at,
            payload: raw.payload,
        }
    }

    fn object_id(&self, map: &Map<String, Value>, depth: usize) -> Option<String> {
        if depth >= MAX_OBJECT_DEPTH {
            return None;
        }
        self.id_fields.iter().find_map(|field| match map.get(field)? {
            Value::String(s) => self.resolve(&classify_str(s)),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(inner) => self.object_id(inner, depth + 1),
            Value::Null | Value::Bool(_) | Value::Array(_) => None,
        })
    }

    fn extract(&self, text: &str) -> Option<String> {
        let captured = constructor_pattern()
            .captures(text)
            .or_else(|| self.fragment.as_ref()?.captures(text))?;
        captured.get(1).map(|m| m.as_str().to_string())
    }
}

fn classify_str(text: &str) -> ParentRef {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        ParentRef::None
    } else if is_clean_identifier(trimmed) {
        ParentRef::Id(trimmed.to_string())
    } else {
        ParentRef::Malformed(trimmed.to_string())
    }
}

/// Normalizes a raw parent reference with the default id fields.
pub fn normalize(raw: &Value) -> Option<String> {
    Normalizer::shared().normalize(raw)
}
