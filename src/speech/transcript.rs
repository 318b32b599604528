//! Transcript segments produced by a speech-recognition engine.

use serde::{Deserialize, Serialize};

/// Interim results below this confidence are not surfaced as current
/// interim text. Final results bypass the gate entirely.
pub const INTERIM_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// One recognized piece of speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Recognized text
    pub text: String,
    /// Engine-reported confidence in [0, 1]
    pub confidence: f32,
    /// Whether the engine considers this segment final
    pub is_final: bool,
    /// BCP-47 tag of the recognized language, when the engine reports one
    #[serde(default)]
    pub language: Option<String>,
    /// Millis since epoch when the segment was captured
    pub captured_at_ms: u64,
}

impl TranscriptSegment {
    /// A final segment.
    pub fn final_segment(text: impl Into<String>, confidence: f32, captured_at_ms: u64) -> Self {
        Self {
            text: text.into(),
            confidence,
            is_final: true,
            language: None,
            captured_at_ms,
        }
    }

    /// An interim (in-progress) segment.
    pub fn interim(text: impl Into<String>, confidence: f32, captured_at_ms: u64) -> Self {
        Self {
            text: text.into(),
            confidence,
            is_final: false,
            language: None,
            captured_at_ms,
        }
    }
}
