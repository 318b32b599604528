//! Voice interaction session state machine.
//!
//! Per session: `Idle → Listening → Processing → Idle`, with `Paused`
//! reachable only from `Listening` and resuming only back to `Listening`.
//! Recognition errors never transition the state; they are reported through
//! a side-channel error field while the session stays where it is.

use crate::error::{ConfabLinkError, Result};

/// States of a voice interaction session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSessionState {
    /// Not listening
    Idle,
    /// Microphone open, waiting for speech
    Listening,
    /// One utterance is being processed
    Processing,
    /// Listening suspended; resume returns to Listening
    Paused,
}

impl VoiceSessionState {
    /// State name for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Paused => "paused",
        }
    }
}

/// A voice interaction session.
#[derive(Debug)]
pub struct VoiceSession {
    state: VoiceSessionState,
    last_error: Option<String>,
}

impl Default for VoiceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceSession {
    /// Create a session in `Idle`.
    pub fn new() -> Self {
        Self {
            state: VoiceSessionState::Idle,
            last_error: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> VoiceSessionState {
        self.state
    }

    /// Begin listening. `Idle → Listening`.
    pub fn start(&mut self) -> Result<()> {
        self.transition("start", VoiceSessionState::Idle, VoiceSessionState::Listening)
    }

    /// An utterance was detected. `Listening → Processing`.
    pub fn begin_utterance(&mut self) -> Result<()> {
        self.transition(
            "begin_utterance",
            VoiceSessionState::Listening,
            VoiceSessionState::Processing,
        )
    }

    /// The utterance was handled. `Processing → Idle`.
    pub fn complete_utterance(&mut self) -> Result<()> {
        self.transition(
            "complete_utterance",
            VoiceSessionState::Processing,
            VoiceSessionState::Idle,
        )
    }

    /// Suspend listening. `Listening → Paused`.
    pub fn pause(&mut self) -> Result<()> {
        self.transition("pause", VoiceSessionState::Listening, VoiceSessionState::Paused)
    }

    /// Resume listening. `Paused → Listening` — never back to `Idle`.
    pub fn resume(&mut self) -> Result<()> {
        self.transition("resume", VoiceSessionState::Paused, VoiceSessionState::Listening)
    }

    /// Stop the session from any state. Always lands in `Idle`.
    pub fn stop(&mut self) {
        self.state = VoiceSessionState::Idle;
    }

    /// Record a recognition error. The state is deliberately untouched:
    /// errors surface via [`last_error`](Self::last_error) while the session
    /// continues wherever it was.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Most recent recognition error, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Clear the error field.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn transition(
        &mut self,
        command: &str,
        expected: VoiceSessionState,
        next: VoiceSessionState,
    ) -> Result<()> {
        if self.state != expected {
            return Err(ConfabLinkError::InvalidTransition {
                state: self.state.as_str().to_string(),
                command: command.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_utterance_cycle() {
        let mut session = VoiceSession::new();
        assert_eq!(session.state(), VoiceSessionState::Idle);
        session.start().unwrap();
        assert_eq!(session.state(), VoiceSessionState::Listening);
        session.begin_utterance().unwrap();
        assert_eq!(session.state(), VoiceSessionState::Processing);
        session.complete_utterance().unwrap();
        assert_eq!(session.state(), VoiceSessionState::Idle);
    }

    #[test]
    fn test_pause_only_from_listening() {
        let mut session = VoiceSession::new();
        assert!(session.pause().is_err());
        session.start().unwrap();
        session.pause().unwrap();
        assert_eq!(session.state(), VoiceSessionState::Paused);
    }

    #[test]
    fn test_resume_returns_to_listening_not_idle() {
        let mut session = VoiceSession::new();
        session.start().unwrap();
        session.pause().unwrap();
        session.resume().unwrap();
        assert_eq!(session.state(), VoiceSessionState::Listening);
    }

    #[test]
    fn test_resume_requires_paused() {
        let mut session = VoiceSession::new();
        session.start().unwrap();
        let err = session.resume().unwrap_err();
        assert!(matches!(err, ConfabLinkError::InvalidTransition { .. }));
        assert_eq!(session.state(), VoiceSessionState::Listening);
    }

    #[test]
    fn test_stop_from_any_state() {
        let mut session = VoiceSession::new();
        session.start().unwrap();
        session.begin_utterance().unwrap();
        session.stop();
        assert_eq!(session.state(), VoiceSessionState::Idle);

        session.start().unwrap();
        session.pause().unwrap();
        session.stop();
        assert_eq!(session.state(), VoiceSessionState::Idle);
    }

    #[test]
    fn test_errors_do_not_transition() {
        let mut session = VoiceSession::new();
        session.start().unwrap();
        session.record_error("recognizer hiccup");
        assert_eq!(session.state(), VoiceSessionState::Listening);
        assert_eq!(session.last_error(), Some("recognizer hiccup"));
        session.clear_error();
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_double_start_is_invalid() {
        let mut session = VoiceSession::new();
        session.start().unwrap();
        assert!(session.start().is_err());
    }
}
