use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;

/// Key under which the parse timestamp is exposed. It replaces the body of
/// any `[LAST_UPDATED]` section in the upstream text, keeping its position.
pub const LAST_UPDATED_KEY: &str = "last_updated";

static SECTION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\[([A-Z_]+)\]\n").expect("section tag pattern must compile")
});

/// Body of one section: plain text, or the items of a `-` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SectionValue {
    Text(String),
    List(Vec<String>),
}

impl SectionValue {
    pub fn to_value(&self) -> Value {
        match self {
            SectionValue::Text(text) => Value::String(text.clone()),
            SectionValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Structured form of the daemon profile text.
///
/// Built fresh for every request and dropped once the response is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDocument {
    sections: IndexMap<String, SectionValue>,
    last_updated: DateTime<Utc>,
}

impl ProfileDocument {
    /// Parse upstream text, stamping the document with the current time.
    pub fn parse(content: &str) -> Self {
        Self::parse_at(content, Utc::now())
    }

    /// Parse upstream text with an explicit timestamp.
    ///
    /// A section starts at a line holding only `[TAG]` (uppercase letters and
    /// underscores) that is both preceded and followed by a newline. Tags are
    /// matched left to right without overlap, text before the first tag is
    /// ignored, empty sections are skipped, and a repeated tag overwrites the
    /// earlier body in place. Sections keep document order.
    pub fn parse_at(content: &str, now: DateTime<Utc>) -> Self {
        let tags: Vec<_> = SECTION_TAG.captures_iter(content).collect();
        let mut sections = IndexMap::new();

        for (idx, captures) in tags.iter().enumerate() {
            let (Some(whole), Some(tag)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let body_end = tags
                .get(idx + 1)
                .and_then(|next| next.get(0))
                .map_or(content.len(), |next| next.start());
            let body = content[whole.end()..body_end].trim();
            if body.is_empty() {
                continue;
            }
            sections.insert(tag.as_str().to_lowercase(), parse_section_body(body));
        }

        Self {
            sections,
            last_updated: now,
        }
    }

    pub fn section(&self, key: &str) -> Option<&SectionValue> {
        self.sections.get(key)
    }

    pub fn sections(&self) -> &IndexMap<String, SectionValue> {
        &self.sections
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// ISO-8601 timestamp with millisecond precision and a `Z` suffix.
    pub fn last_updated_iso(&self) -> String {
        self.last_updated.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Look a key up the way a caller-supplied section name is resolved:
    /// verbatim, with `last_updated` answering the parse timestamp.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        if key == LAST_UPDATED_KEY {
            return Some(Value::String(self.last_updated_iso()));
        }
        self.sections.get(key).map(SectionValue::to_value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// Document order; the timestamp takes the slot of a `[LAST_UPDATED]`
// section when there is one, otherwise it comes last.
impl Serialize for ProfileDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let last_updated = self.last_updated_iso();
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.sections {
            if key == LAST_UPDATED_KEY {
                map.serialize_entry(key, &last_updated)?;
            } else {
                map.serialize_entry(key, value)?;
            }
        }
        if !self.sections.contains_key(LAST_UPDATED_KEY) {
            map.serialize_entry(LAST_UPDATED_KEY, &last_updated)?;
        }
        map.end()
    }
}

// A section is a list only when some line after the first starts with `-`
// at column 0. A lone first-line item stays text.
fn parse_section_body(body: &str) -> SectionValue {
    if !body.contains("\n-") {
        return SectionValue::Text(body.to_string());
    }
    let items = body
        .lines()
        .filter(|line| line.trim().starts_with('-'))
        .map(strip_list_marker)
        .collect();
    SectionValue::List(items)
}

// Only a marker at column 0 is removed; an indented `  - x` keeps its dash.
fn strip_list_marker(line: &str) -> String {
    line.strip_prefix('-')
        .map(str::trim_start)
        .unwrap_or(line)
        .trim()
        .to_string()
}
