//! Speech adapters: recognition session state, text-to-speech commands, and
//! the voice-interaction state machine.
//!
//! Engines are external collaborators. Recognition engines push
//! [`TranscriptSegment`]s into a [`RecognitionSession`]; synthesis engines
//! implement [`SpeechSynthesizer`]. Everything here is the pure session
//! logic: confidence gating, restart policy, voice selection, and state
//! transitions.

pub mod recognizer;
pub mod session;
pub mod synthesis;
pub mod transcript;

pub use recognizer::{ErrorDisposition, RecognitionErrorKind, RecognitionSession};
pub use session::{VoiceSession, VoiceSessionState};
pub use synthesis::{
    select_voice_for_language, speak_auto, SpeechSynthesizer, Utterance, UtteranceConfig, Voice,
};
pub use transcript::{TranscriptSegment, INTERIM_CONFIDENCE_THRESHOLD};
