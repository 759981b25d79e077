use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::personalization::PersonalizationConfig;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Summary key that every successful result carries.
pub const ORIGINAL: &str = "original";

/// A file picked by the user, waiting in the pending batch.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl SelectedFile {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size())
            .finish()
    }
}

/// Per-request knobs for an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Also return the summary translated into this language.
    pub target_language: Option<String>,
    /// Replaces the default summarization instruction.
    pub custom_prompt: Option<String>,
    pub personalization: Option<PersonalizationConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub filename: String,
    #[serde(default)]
    pub summaries: BTreeMap<String, String>,
    #[serde(rename = "originalText", default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentResult {
    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// The untranslated summary; `None` for a result that failed.
    pub fn original_summary(&self) -> Option<&str> {
        if self.error.is_some() {
            return None;
        }
        self.summaries.get(ORIGINAL).map(String::as_str)
    }

    pub fn summary(&self, language: &str) -> Option<&str> {
        self.summaries.get(language).map(String::as_str)
    }

    pub fn has_summary(&self, language: &str) -> bool {
        self.summaries.contains_key(language)
    }

    /// Only results with a usable summary accept feedback.
    pub fn accepts_feedback(&self) -> bool {
        self.original_summary().is_some()
    }

    /// `"<filename>: <error>"` for failed results.
    pub fn error_line(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|error| format!("{}: {}", self.filename, error))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub processing_timestamp: String,
    pub total_files_processed: usize,
}

impl BatchMetadata {
    /// Parses the backend timestamp, which is ISO-8601 with or without an offset.
    pub fn processed_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.processing_timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(&self.processing_timestamp)
                    .ok()
                    .map(|dt| dt.naive_utc())
            })
    }
}

/// Everything the backend returned for one request, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub results: Vec<DocumentResult>,
    pub metadata: Option<BatchMetadata>,
}

impl BatchResult {
    /// Newline-joined `"<filename>: <error>"` lines, `None` when every file succeeded.
    pub fn error_summary(&self) -> Option<String> {
        let lines: Vec<String> = self
            .results
            .iter()
            .filter_map(DocumentResult::error_line)
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Language code to display name.
pub type LanguageCatalog = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInterest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Helpful,
    Unclear,
    Inaccurate,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Helpful => "helpful",
            Self::Unclear => "unclear",
            Self::Inaccurate => "inaccurate",
        }
    }

    /// Unclear and inaccurate feedback asks for details and may come back refined.
    pub fn requests_refinement(&self) -> bool {
        matches!(self, Self::Unclear | Self::Inaccurate)
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "helpful" => Ok(Self::Helpful),
            "unclear" => Ok(Self::Unclear),
            "inaccurate" => Ok(Self::Inaccurate),
            other => Err(format!("Unknown feedback type: {}", other)),
        }
    }
}

/// One feedback submission, as sent to `/feedback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub summary_id: String,
    pub feedback_type: FeedbackType,
    pub original_text: Option<String>,
    pub original_summary: Option<String>,
    pub feedback_text: Option<String>,
    pub target_language: Option<String>,
}

impl FeedbackRecord {
    pub fn new(summary_id: impl Into<String>, feedback_type: FeedbackType) -> Self {
        Self {
            summary_id: summary_id.into(),
            feedback_type,
            original_text: None,
            original_summary: None,
            feedback_text: None,
            target_language: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub summaries: Option<BTreeMap<String, String>>,
}

impl FeedbackReply {
    pub fn refined_summary(&self) -> Option<&str> {
        self.summaries
            .as_ref()
            .and_then(|summaries| summaries.get(ORIGINAL))
            .map(String::as_str)
    }
}

/// Existing summaries of one result, sent back for translation without the file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationItem {
    pub filename: String,
    pub summaries: BTreeMap<String, String>,
}

impl From<&DocumentResult> for TranslationItem {
    fn from(result: &DocumentResult) -> Self {
        Self {
            filename: result.filename.clone(),
            summaries: result.summaries.clone(),
        }
    }
}
