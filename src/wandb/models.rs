//! Serde models for run records returned by the W&B GraphQL API.
//!
//! The service is lenient about several fields: `jobSummaryMetrics` may
//! arrive as a JSON object or as a JSON-encoded string depending on the
//! producer, and `historyKeys` may be a plain array or an object whose
//! `keys` field maps metric names to metadata. The deserializers here accept
//! all observed shapes and fall back to empty rather than failing the whole
//! record.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Lifecycle state reported by the service. The set is open; unrecognized
/// states collapse into [`RunState::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Finished,
    Failed,
    Crashed,
    #[serde(other)]
    Other,
}

impl RunState {
    /// Short label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Crashed => "crashed",
            Self::Other => "other",
        }
    }
}

/// Owner of a run, as reported by the list query.
#[derive(Debug, Clone, Deserialize)]
pub struct RunUser {
    pub name: String,
}

/// Summary form of a run, one entry in the project run list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub state: RunState,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub user: Option<RunUser>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sweep_name: Option<String>,
    #[serde(
        default,
        rename = "jobSummaryMetrics",
        deserialize_with = "de_summary_metrics"
    )]
    pub summary_metrics: Map<String, Value>,
}

impl RunSummary {
    /// Preferred human-readable title: display name when set, else name.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Detail form of a run, fetched lazily for the current selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub state: RunState,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(
        default,
        rename = "jobSummaryMetrics",
        deserialize_with = "de_summary_metrics"
    )]
    pub summary_metrics: Map<String, Value>,
    #[serde(default, deserialize_with = "de_history_keys")]
    pub history_keys: Vec<String>,
}

impl RunDetail {
    /// Preferred human-readable title: display name when set, else name.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

fn de_summary_metrics<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(summary_metrics_from_value(value))
}

/// Coerce the `jobSummaryMetrics` payload into a metric map.
pub(crate) fn summary_metrics_from_value(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::String(text) => serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|parsed| match parsed {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Map::new(),
    }
}

fn de_history_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(history_keys_from_value(value))
}

/// Coerce the `historyKeys` payload into a sorted list of metric names.
pub(crate) fn history_keys_from_value(value: Value) -> Vec<String> {
    let mut keys: Vec<String> = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        Value::Object(map) => match map.get("keys") {
            Some(Value::Object(inner)) => inner.keys().cloned().collect(),
            _ => map.keys().cloned().collect(),
        },
        _ => Vec::new(),
    };
    keys.sort();
    keys
}
