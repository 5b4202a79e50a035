use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::Problems;

/// Uniform failure body shared by every recoverable error kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEnvelope {
    pub success: bool,
    pub code: String,
    pub summary: String,
    pub problems: Vec<String>,
    pub timestamp: String,
}

impl FailureEnvelope {
    pub fn new(code: &str, summary: impl Into<String>, problems: Vec<String>) -> Self {
        Self::at(code, summary, problems, Utc::now())
    }

    pub fn at(code: &str, summary: impl Into<String>, problems: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            success: false,
            code: code.to_string(),
            summary: summary.into(),
            problems,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Envelope carrying a single problem equal to the summary
    pub fn single(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(code, message.clone(), vec![message])
    }
}

/// Concatenate problem lists in call order.
///
/// Returns `None` when nothing was reported; otherwise the combined list
/// wrapped in an `INVALID_INPUT` envelope under `summary`.
pub fn collect<I>(summary: &str, lists: I) -> Option<FailureEnvelope>
where
    I: IntoIterator<Item = Problems>,
{
    let problems: Vec<String> = lists.into_iter().flatten().collect();
    if problems.is_empty() {
        None
    } else {
        Some(FailureEnvelope::new("INVALID_INPUT", summary, problems))
    }
}
