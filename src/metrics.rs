//! Normalization of producer-specific summary metrics.
//!
//! Training frameworks disagree about metric field names (`loss` vs
//! `train_loss`, `_step` vs `global_step`, ...). [`normalize`] probes an
//! ordered list of candidate keys per canonical field and takes the first
//! finite number; absence yields `None`, never zero. The result is a pure
//! view transform, recomputed on every render and never stored.

use serde_json::{Map, Value};

const LOSS_KEYS: &[&str] = &["eval_loss", "train_loss", "loss"];
const TRAIN_LOSS_KEYS: &[&str] = &["train_loss"];
const EVAL_LOSS_KEYS: &[&str] = &["eval_loss"];
const ACCURACY_KEYS: &[&str] = &["accuracy", "eval_accuracy"];
const LEARNING_RATE_KEYS: &[&str] = &["learning_rate", "lr"];
const STEP_KEYS: &[&str] = &["global_step", "_step", "step"];
const THROUGHPUT_KEYS: &[&str] = &["samples_per_second", "tokens_per_second"];
const TOTAL_STEP_KEYS: &[&str] = &["total_steps", "max_steps", "num_train_steps"];

/// Placeholder rendered for metrics that carry no value.
pub const NO_VALUE: &str = "-";

/// Training progress derived from step counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub current: f64,
    pub total: f64,
    /// Rounded percentage, clamped to 0..=100 even when the producer reports
    /// a step beyond the configured total.
    pub percent: u8,
}

/// Framework-agnostic view of a run's key metrics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricSnapshot {
    pub loss: Option<f64>,
    pub train_loss: Option<f64>,
    pub eval_loss: Option<f64>,
    pub accuracy: Option<f64>,
    pub learning_rate: Option<f64>,
    pub step: Option<f64>,
    pub throughput: Option<f64>,
    pub progress: Option<Progress>,
}

/// Map a sparse summary-metrics object onto the canonical snapshot.
pub fn normalize(summary: &Map<String, Value>) -> MetricSnapshot {
    let step = probe(summary, STEP_KEYS);
    MetricSnapshot {
        loss: probe(summary, LOSS_KEYS),
        train_loss: probe(summary, TRAIN_LOSS_KEYS),
        eval_loss: probe(summary, EVAL_LOSS_KEYS),
        accuracy: probe(summary, ACCURACY_KEYS),
        learning_rate: probe(summary, LEARNING_RATE_KEYS),
        step,
        throughput: probe(summary, THROUGHPUT_KEYS),
        progress: derive_progress(probe(summary, TOTAL_STEP_KEYS), step),
    }
}

/// First finite numeric value among the candidate keys.
fn probe(summary: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| summary.get(*key))
        .filter_map(Value::as_f64)
        .find(|value| value.is_finite())
}

fn derive_progress(total: Option<f64>, current: Option<f64>) -> Option<Progress> {
    let total = total?;
    let current = current?;
    // A zero or negative total means the producer has not published a real
    // step budget; progress is unavailable rather than 0%.
    if total <= 0.0 {
        return None;
    }
    let percent = ((current / total) * 100.0).round().clamp(0.0, 100.0) as u8;
    Some(Progress {
        current,
        total,
        percent,
    })
}

/// Render a loss or accuracy value to 4 decimal places.
pub fn format_fixed4(value: Option<f64>) -> String {
    value.map_or_else(|| NO_VALUE.to_string(), |v| format!("{v:.4}"))
}

/// Render a learning rate in exponential notation.
pub fn format_exponential(value: Option<f64>) -> String {
    value.map_or_else(|| NO_VALUE.to_string(), |v| format!("{v:.2e}"))
}

/// Render a throughput value to 2 decimal places.
pub fn format_fixed2(value: Option<f64>) -> String {
    value.map_or_else(|| NO_VALUE.to_string(), |v| format!("{v:.2}"))
}

/// Render a step counter, dropping a trailing `.0` for whole numbers.
pub fn format_count(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 => {
            format!("{}", v as i64)
        }
        Some(v) => format!("{v}"),
        None => NO_VALUE.to_string(),
    }
}
