//! Request and response models for the translation/summary edge functions.

use serde::{Deserialize, Serialize};

/// Request body for the `translate` function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    /// Text to translate
    pub source_text: String,
    /// BCP-47 tag of the source language; None asks the server to detect it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    /// BCP-47 tag of the target language
    pub target_language: String,
}

impl TranslateRequest {
    /// Translate `source_text` into `target_language`, detecting the source
    /// language server-side.
    pub fn detect(source_text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            source_language: None,
            target_language: target_language.into(),
        }
    }

    /// Translate with a known source language.
    pub fn new(
        source_text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            source_language: Some(source_language.into()),
            target_language: target_language.into(),
        }
    }
}

/// Successful translation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Translated text; the original text when no translation was needed
    pub text: String,
    /// Source language, as supplied or as detected by the server
    pub source_language: Option<String>,
    /// False when source and target language matched and the text was
    /// returned unchanged without a network call
    pub translated: bool,
}

/// Wire body of a successful `translate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TranslateResponseBody {
    pub translated_text: String,
    #[serde(default)]
    pub detected_source_language: Option<String>,
}

/// Request body for the `summary` function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Meeting to summarize
    pub meeting_id: String,
    /// Display names of the participants, included in the prompt
    pub participants: Vec<String>,
}

/// Successful summary result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Generated meeting summary
    pub summary: String,
}

/// Error body the edge functions return alongside non-success statuses
/// (and occasionally inside a 200).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FunctionErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}
