//! Continuous speech-recognition session state.
//!
//! The engine itself (a platform speech API, a streaming STT service) lives
//! outside this crate; it drives a [`RecognitionSession`] by pushing
//! segments and reporting errors. The session owns the transcript state:
//! the interim confidence gate, the final segment list, and the
//! restart-on-error policy for continuous listening.

use crate::speech::transcript::{TranscriptSegment, INTERIM_CONFIDENCE_THRESHOLD};

/// Engine error categories, mirroring the platform speech API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// No speech detected before the engine's silence deadline
    NoSpeech,
    /// Microphone capture failed
    AudioCapture,
    /// Network hiccup between engine and recognition service
    Network,
    /// Permission denied; restarting would fail identically
    NotAllowed,
    /// Recognition was aborted by the host
    Aborted,
    /// Anything else
    Other,
}

impl RecognitionErrorKind {
    /// Whether a continuous session should restart after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NotAllowed | Self::Aborted)
    }
}

/// What the engine adapter should do after reporting an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Restart the engine and keep listening
    Restart,
    /// Stop; the session is no longer running
    Stop,
}

/// Transcript state for one recognition run.
#[derive(Debug, Default)]
pub struct RecognitionSession {
    continuous: bool,
    running: bool,
    final_segments: Vec<TranscriptSegment>,
    interim_text: Option<String>,
    last_error: Option<String>,
    restarts: u32,
}

impl RecognitionSession {
    /// Create a session. Continuous sessions restart after recoverable
    /// engine errors; one-shot sessions stop on any error.
    pub fn new(continuous: bool) -> Self {
        Self {
            continuous,
            ..Self::default()
        }
    }

    /// Mark the session started. Clears transcript and error state.
    pub fn start(&mut self) {
        self.running = true;
        self.final_segments.clear();
        self.interim_text = None;
        self.last_error = None;
        self.restarts = 0;
    }

    /// Mark the session stopped. Transcript state is retained for reading.
    pub fn stop(&mut self) {
        self.running = false;
        self.interim_text = None;
    }

    /// Returns true while the session is listening.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Feed one segment from the engine.
    ///
    /// Final segments are always appended to the transcript, regardless of
    /// confidence — a stricter floor is applied only on read via
    /// [`filtered_transcripts`](Self::filtered_transcripts). Interim
    /// segments must clear [`INTERIM_CONFIDENCE_THRESHOLD`] to be surfaced;
    /// low-confidence interims are dropped without clearing the previous
    /// interim text.
    pub fn push_segment(&mut self, segment: TranscriptSegment) {
        if segment.is_final {
            self.interim_text = None;
            self.final_segments.push(segment);
        } else if segment.confidence >= INTERIM_CONFIDENCE_THRESHOLD {
            self.interim_text = Some(segment.text);
        }
    }

    /// Record an engine error and decide whether to restart.
    ///
    /// Errors never clear transcript state and never transition the session
    /// anywhere on their own; they are surfaced via
    /// [`last_error`](Self::last_error) while the restart policy decides
    /// whether listening continues.
    pub fn record_error(
        &mut self,
        kind: RecognitionErrorKind,
        message: impl Into<String>,
    ) -> ErrorDisposition {
        self.last_error = Some(message.into());
        if self.running && self.continuous && kind.is_recoverable() {
            self.restarts += 1;
            ErrorDisposition::Restart
        } else {
            self.running = false;
            ErrorDisposition::Stop
        }
    }

    /// Current interim text, if any cleared the confidence gate.
    pub fn interim_text(&self) -> Option<&str> {
        self.interim_text.as_deref()
    }

    /// All final segments, in capture order.
    pub fn final_segments(&self) -> &[TranscriptSegment] {
        &self.final_segments
    }

    /// Final segments at or above a caller-supplied confidence floor.
    pub fn filtered_transcripts(&self, min_confidence: f32) -> Vec<&TranscriptSegment> {
        self.final_segments
            .iter()
            .filter(|segment| segment.confidence >= min_confidence)
            .collect()
    }

    /// The full final transcript as one string.
    pub fn transcript_text(&self) -> String {
        self.final_segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Most recent engine error message, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of restarts performed in this run.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_confidence_interim_is_not_surfaced() {
        let mut session = RecognitionSession::new(true);
        session.start();
        session.push_segment(TranscriptSegment::interim("maybe words", 0.5, 1));
        assert_eq!(session.interim_text(), None);
    }

    #[test]
    fn test_high_confidence_interim_is_surfaced() {
        let mut session = RecognitionSession::new(true);
        session.start();
        session.push_segment(TranscriptSegment::interim("clear words", 0.9, 1));
        assert_eq!(session.interim_text(), Some("clear words"));
    }

    #[test]
    fn test_low_confidence_final_is_still_appended() {
        let mut session = RecognitionSession::new(true);
        session.start();
        session.push_segment(TranscriptSegment::final_segment("mumbled", 0.5, 1));
        assert_eq!(session.final_segments().len(), 1);
        assert_eq!(session.final_segments()[0].text, "mumbled");
    }

    #[test]
    fn test_final_clears_interim() {
        let mut session = RecognitionSession::new(true);
        session.start();
        session.push_segment(TranscriptSegment::interim("hello wor", 0.9, 1));
        session.push_segment(TranscriptSegment::final_segment("hello world", 0.95, 2));
        assert_eq!(session.interim_text(), None);
        assert_eq!(session.transcript_text(), "hello world");
    }

    #[test]
    fn test_filtered_transcripts_applies_caller_floor() {
        let mut session = RecognitionSession::new(true);
        session.start();
        session.push_segment(TranscriptSegment::final_segment("solid", 0.95, 1));
        session.push_segment(TranscriptSegment::final_segment("shaky", 0.4, 2));
        let filtered = session.filtered_transcripts(0.8);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].text, "solid");
        // The unfiltered list still holds both.
        assert_eq!(session.final_segments().len(), 2);
    }

    #[test]
    fn test_recoverable_error_restarts_continuous_session() {
        let mut session = RecognitionSession::new(true);
        session.start();
        session.push_segment(TranscriptSegment::final_segment("kept", 0.9, 1));
        let disposition = session.record_error(RecognitionErrorKind::Network, "net blip");
        assert_eq!(disposition, ErrorDisposition::Restart);
        assert!(session.is_running());
        assert_eq!(session.restarts(), 1);
        assert_eq!(session.last_error(), Some("net blip"));
        // Transcript survives the error.
        assert_eq!(session.final_segments().len(), 1);
    }

    #[test]
    fn test_unrecoverable_error_stops_session() {
        let mut session = RecognitionSession::new(true);
        session.start();
        let disposition =
            session.record_error(RecognitionErrorKind::NotAllowed, "permission denied");
        assert_eq!(disposition, ErrorDisposition::Stop);
        assert!(!session.is_running());
    }

    #[test]
    fn test_one_shot_session_stops_on_any_error() {
        let mut session = RecognitionSession::new(false);
        session.start();
        let disposition = session.record_error(RecognitionErrorKind::NoSpeech, "silence");
        assert_eq!(disposition, ErrorDisposition::Stop);
        assert!(!session.is_running());
    }

    #[test]
    fn test_start_clears_previous_run() {
        let mut session = RecognitionSession::new(true);
        session.start();
        session.push_segment(TranscriptSegment::final_segment("old", 0.9, 1));
        session.record_error(RecognitionErrorKind::Network, "blip");
        session.stop();

        session.start();
        assert!(session.final_segments().is_empty());
        assert!(session.last_error().is_none());
        assert_eq!(session.restarts(), 0);
    }
}
