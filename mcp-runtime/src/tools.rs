use std::sync::LazyLock;

use daemon_core::profile::ProfileDocument;
use serde::Serialize;
use serde_json::{Map, Value, json};

static TOOL_DEFINITIONS: LazyLock<Vec<ToolDefinition>> = LazyLock::new(|| {
    Tool::VARIANTS
        .iter()
        .map(|tool| ToolDefinition {
            name: tool.name(),
            description: tool.description(),
            input_schema: tool.input_schema(),
        })
        .collect()
});

#[derive(Debug, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The closed set of tools exposed over `tools/call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    About,
    CurrentLocation,
    Mission,
    Preferences,
    Telos,
    FavoriteBooks,
    FavoriteMovies,
    FavoritePodcasts,
    DailyRoutine,
    Predictions,
    All,
    Section,
}

impl Tool {
    /// Catalog order.
    pub const VARIANTS: [Tool; 12] = [
        Tool::About,
        Tool::CurrentLocation,
        Tool::Mission,
        Tool::Preferences,
        Tool::Telos,
        Tool::FavoriteBooks,
        Tool::FavoriteMovies,
        Tool::FavoritePodcasts,
        Tool::DailyRoutine,
        Tool::Predictions,
        Tool::All,
        Tool::Section,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS.into_iter().find(|tool| tool.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tool::About => "get_about",
            Tool::CurrentLocation => "get_current_location",
            Tool::Mission => "get_mission",
            Tool::Preferences => "get_preferences",
            Tool::Telos => "get_telos",
            Tool::FavoriteBooks => "get_favorite_books",
            Tool::FavoriteMovies => "get_favorite_movies",
            Tool::FavoritePodcasts => "get_favorite_podcasts",
            Tool::DailyRoutine => "get_daily_routine",
            Tool::Predictions => "get_predictions",
            Tool::All => "get_all",
            Tool::Section => "get_section",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::About => "Get information about Tim Kleinschmidt",
            Tool::CurrentLocation => "Get current location",
            Tool::Mission => "Get mission statement",
            Tool::Preferences => "Get preferences and work style",
            Tool::Telos => "Get TELOS framework",
            Tool::FavoriteBooks => "Get favorite books",
            Tool::FavoriteMovies => "Get favorite movies",
            Tool::FavoritePodcasts => "Get favorite podcasts",
            Tool::DailyRoutine => "Get daily routine",
            Tool::Predictions => "Get predictions about the future",
            Tool::All => "Get all daemon data",
            Tool::Section => "Get a specific section by name",
        }
    }

    fn input_schema(self) -> Value {
        match self {
            Tool::Section => json!({
                "type": "object",
                "properties": {
                    "section": { "type": "string", "description": "Section name to retrieve" }
                },
                "required": ["section"]
            }),
            _ => json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    /// Resolve this tool against a parsed document. Missing data is never an
    /// error here: text getters fall back to a placeholder sentence and list
    /// getters to an empty array.
    pub fn resolve(
        self,
        document: &ProfileDocument,
        args: Option<&Map<String, Value>>,
    ) -> Value {
        match self {
            Tool::About => text_or(document, "about", "About section not available"),
            Tool::CurrentLocation => {
                text_or(document, "current_location", "Location not available")
            }
            Tool::Mission => text_or(document, "mission", "Mission not available"),
            Tool::Preferences => list_or_empty(document, "preferences"),
            Tool::Telos => list_or_empty(document, "telos"),
            Tool::FavoriteBooks => list_or_empty(document, "favorite_books"),
            Tool::FavoriteMovies => list_or_empty(document, "favorite_movies"),
            Tool::FavoritePodcasts => list_or_empty(document, "favorite_podcasts"),
            Tool::DailyRoutine => list_or_empty(document, "daily_routine"),
            Tool::Predictions => list_or_empty(document, "predictions"),
            Tool::All => document.to_value(),
            Tool::Section => section_by_name(document, args),
        }
    }
}

pub fn tool_definitions() -> &'static [ToolDefinition] {
    &TOOL_DEFINITIONS
}

/// Dispatch by tool name. `None` means the tool does not exist, which is
/// distinct from every resolved value (including `""` and `[]`).
pub fn execute_tool(
    name: &str,
    document: &ProfileDocument,
    args: Option<&Map<String, Value>>,
) -> Option<Value> {
    Tool::from_name(name).map(|tool| tool.resolve(document, args))
}

fn text_or(document: &ProfileDocument, key: &str, fallback: &str) -> Value {
    document
        .lookup(key)
        .unwrap_or_else(|| Value::String(fallback.to_string()))
}

fn list_or_empty(document: &ProfileDocument, key: &str) -> Value {
    document
        .lookup(key)
        .unwrap_or_else(|| Value::Array(Vec::new()))
}

fn section_by_name(document: &ProfileDocument, args: Option<&Map<String, Value>>) -> Value {
    let Some(name) = args
        .and_then(|args| args.get("section"))
        .and_then(argument_text)
    else {
        return Value::String("Section name required".to_string());
    };

    document
        .lookup(&name)
        .unwrap_or_else(|| Value::String(format!("Section '{name}' not found")))
}

/// Text of a caller-supplied name argument. `null`, `false`, `0` and `""`
/// count as absent; other non-strings are rendered as JSON.
pub(crate) fn argument_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
