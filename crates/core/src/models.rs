use crate::error::{InferenceError, SessionError};
use crate::inference::DEFAULT_MODEL;
use crate::language::LanguageTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

impl PageText {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub file_name: Option<String>,
    pub checksum: String,
    pub byte_len: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Text content of one uploaded PDF, pages in physical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub fingerprint: DocumentFingerprint,
    pub pages: Vec<PageText>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Sample used for language detection: the first three pages glued together.
    pub fn language_sample(&self) -> String {
        self.pages
            .iter()
            .take(LANGUAGE_SAMPLE_PAGES)
            .map(|page| page.text.as_str())
            .collect()
    }

    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub const LANGUAGE_SAMPLE_PAGES: usize = 3;

/// Document plus the language tag derived from it at upload time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub document: Document,
    pub language_code: Option<String>,
    pub language: LanguageTag,
}

/// Number of key points requested per page summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct HighlightCount(u8);

impl HighlightCount {
    pub const MIN: u8 = 3;
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Result<Self, SessionError> {
        if value < i64::from(Self::MIN) || value > i64::from(Self::MAX) {
            return Err(SessionError::InvalidHighlightCount {
                min: Self::MIN,
                max: Self::MAX,
                got: value,
            });
        }
        Ok(Self(value as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for HighlightCount {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<i64> for HighlightCount {
    type Error = SessionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HighlightCount> for u8 {
    fn from(value: HighlightCount) -> Self {
        value.0
    }
}

impl std::fmt::Display for HighlightCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Model and request fan-out used by both orchestrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub model: String,
    /// Page summaries allowed in flight at once; 1 keeps runs strictly sequential.
    pub max_in_flight: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_in_flight: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummaryRequest<'a> {
    pub page: &'a PageText,
    pub highlights: HighlightCount,
}

/// Generated text, or the error marker recorded in its place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Generation {
    Completed { text: String },
    Failed { error: String },
}

impl Generation {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Completed { text } => Some(text),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<Result<String, InferenceError>> for Generation {
    fn from(value: Result<String, InferenceError>) -> Self {
        match value {
            Ok(text) => Self::Completed { text },
            Err(error) => Self::Failed {
                error: error.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryResult {
    pub page_number: u32,
    pub generation: Generation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRun {
    pub highlights: HighlightCount,
    pub language: LanguageTag,
    pub results: Vec<SummaryResult>,
    pub completed_at: DateTime<Utc>,
}

impl SummaryRun {
    pub fn failed_pages(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.generation.is_failed())
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct QaRequest<'a> {
    pub document_text: String,
    pub question: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QaResult {
    pub question: String,
    pub answer: Generation,
}
