use std::fmt;

use annotator_core::Sentiment;
use serde::{Deserialize, Serialize};

/// Subject identifier extracted from a URL, e.g. `"4821"`.
pub type SubjectId = String;

/// Terminal value of one fetch, shared by every caller of the cache.
pub type ScoreOutcome = Result<ScoreResult, FetchError>;

/// Score label as sent by the scoring service.
///
/// Anything other than `positive`/`negative` is kept verbatim so it can still
/// be shown, but it never influences the derived sentiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    Positive,
    Negative,
    Other(String),
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Positive => "positive",
            Label::Negative => "negative",
            Label::Other(raw) => raw,
        }
    }

    pub fn polarity(&self) -> Option<Sentiment> {
        match self {
            Label::Positive => Some(Sentiment::Positive),
            Label::Negative => Some(Sentiment::Negative),
            Label::Other(_) => None,
        }
    }
}

impl From<String> for Label {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Label::Positive,
            "negative" => Label::Negative,
            _ => Label::Other(raw),
        }
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub label: Label,
    /// In `0.0..=1.0`.
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl Score {
    /// Confidence as a rounded whole percentage.
    pub fn confidence_percent(&self) -> i64 {
        (self.confidence * 100.0).round() as i64
    }
}

/// Response payload for one subject. Both sub-scores absent means "no data".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Score>,
}

impl ScoreResult {
    pub fn has_data(&self) -> bool {
        self.interaction.is_some() || self.outcome.is_some()
    }

    pub fn sentiment(&self) -> Sentiment {
        Sentiment::derive([
            self.interaction.as_ref().and_then(|s| s.label.polarity()),
            self.outcome.as_ref().and_then(|s| s.label.polarity()),
        ])
    }

    /// Present sub-scores with their display names, in render order.
    pub fn sub_scores(&self) -> impl Iterator<Item = (&'static str, &Score)> {
        [
            ("Interaction", self.interaction.as_ref()),
            ("Outcome", self.outcome.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, score)| score.map(|s| (name, s)))
    }
}

/// Uniform failure shape produced at the fetch boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("invalid url")]
    InvalidUrl,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("network error")]
    Network,
    #[error("malformed response")]
    Decode,
    #[error("fetch aborted")]
    Aborted,
}
