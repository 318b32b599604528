//! Text-to-speech command surface.
//!
//! The synthesizer itself is a platform concern behind the
//! [`SpeechSynthesizer`] trait; this module owns utterance configuration
//! (with range clamping matching the platform APIs) and language-based
//! voice selection for the auto-language speaking path.

use crate::error::Result;

/// A voice offered by the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Engine-assigned voice identifier
    pub id: String,
    /// Human-readable voice name
    pub name: String,
    /// BCP-47 language tag, e.g. "en-US"
    pub language: String,
    /// Whether the engine marks this as its default voice
    pub default: bool,
}

/// Utterance configuration. Ranges follow the platform speech APIs:
/// rate 0.1–10, pitch 0–2, volume 0–1; out-of-range values are clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceConfig {
    /// Voice to use; None lets the engine pick
    pub voice_id: Option<String>,
    /// Speaking rate
    pub rate: f32,
    /// Voice pitch
    pub pitch: f32,
    /// Output volume
    pub volume: f32,
}

impl Default for UtteranceConfig {
    fn default() -> Self {
        Self {
            voice_id: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl UtteranceConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the voice.
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    /// Set the speaking rate, clamped to [0.1, 10].
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate.clamp(0.1, 10.0);
        self
    }

    /// Set the pitch, clamped to [0, 2].
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch.clamp(0.0, 2.0);
        self
    }

    /// Set the volume, clamped to [0, 1].
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }
}

/// One piece of text to speak.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak
    pub text: String,
    /// Delivery configuration
    pub config: UtteranceConfig,
}

impl Utterance {
    /// An utterance with default configuration.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            config: UtteranceConfig::default(),
        }
    }

    /// An utterance with explicit configuration.
    pub fn with_config(text: impl Into<String>, config: UtteranceConfig) -> Self {
        Self {
            text: text.into(),
            config,
        }
    }
}

/// Seam to the platform text-to-speech engine.
///
/// Commands are stateless from the caller's perspective: speak enqueues,
/// pause/resume/stop act on whatever is in flight.
pub trait SpeechSynthesizer {
    /// Enqueue an utterance.
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;
    /// Pause in-flight speech.
    fn pause(&mut self);
    /// Resume paused speech.
    fn resume(&mut self);
    /// Stop and discard all queued speech.
    fn stop(&mut self);
    /// Voices the engine offers.
    fn voices(&self) -> Vec<Voice>;
}

/// Pick the voice best matching a language tag.
///
/// Preference order: exact tag match, then primary-subtag match ("fr"
/// matches "fr-CA"), then the engine default, then nothing.
pub fn select_voice_for_language<'a>(voices: &'a [Voice], language: &str) -> Option<&'a Voice> {
    let primary = language.split('-').next().unwrap_or(language);

    voices
        .iter()
        .find(|voice| voice.language.eq_ignore_ascii_case(language))
        .or_else(|| {
            voices.iter().find(|voice| {
                voice
                    .language
                    .split('-')
                    .next()
                    .is_some_and(|p| p.eq_ignore_ascii_case(primary))
            })
        })
        .or_else(|| voices.iter().find(|voice| voice.default))
}

/// Speak `text` in a voice matching `language`.
///
/// The auto-language path: resolve a voice by language tag, then hand the
/// utterance to the engine with that voice set. Falls back to the engine's
/// own choice when no voice matches.
pub fn speak_auto<S: SpeechSynthesizer>(
    synthesizer: &mut S,
    text: &str,
    language: &str,
    config: UtteranceConfig,
) -> Result<()> {
    let voices = synthesizer.voices();
    let config = match select_voice_for_language(&voices, language) {
        Some(voice) => config.with_voice(voice.id.clone()),
        None => config,
    };
    synthesizer.speak(&Utterance::with_config(text, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(id: &str, language: &str, default: bool) -> Voice {
        Voice {
            id: id.to_string(),
            name: id.to_string(),
            language: language.to_string(),
            default,
        }
    }

    #[test]
    fn test_config_clamping() {
        let config = UtteranceConfig::new()
            .with_rate(100.0)
            .with_pitch(-3.0)
            .with_volume(2.0);
        assert_eq!(config.rate, 10.0);
        assert_eq!(config.pitch, 0.0);
        assert_eq!(config.volume, 1.0);
    }

    #[test]
    fn test_exact_language_match_wins() {
        let voices = vec![
            voice("v1", "en-US", true),
            voice("v2", "fr-FR", false),
            voice("v3", "fr-CA", false),
        ];
        let selected = select_voice_for_language(&voices, "fr-CA").unwrap();
        assert_eq!(selected.id, "v3");
    }

    #[test]
    fn test_primary_subtag_match() {
        let voices = vec![voice("v1", "en-US", true), voice("v2", "fr-CA", false)];
        let selected = select_voice_for_language(&voices, "fr").unwrap();
        assert_eq!(selected.id, "v2");
    }

    #[test]
    fn test_falls_back_to_default_voice() {
        let voices = vec![voice("v1", "en-US", true), voice("v2", "de-DE", false)];
        let selected = select_voice_for_language(&voices, "ja").unwrap();
        assert_eq!(selected.id, "v1");
    }

    #[test]
    fn test_no_voices_yields_none() {
        assert!(select_voice_for_language(&[], "en").is_none());
    }

    #[test]
    fn test_speak_auto_sets_matching_voice() {
        struct Recorder {
            spoken: Vec<Utterance>,
        }

        impl SpeechSynthesizer for Recorder {
            fn speak(&mut self, utterance: &Utterance) -> Result<()> {
                self.spoken.push(utterance.clone());
                Ok(())
            }
            fn pause(&mut self) {}
            fn resume(&mut self) {}
            fn stop(&mut self) {}
            fn voices(&self) -> Vec<Voice> {
                vec![voice("en-voice", "en-US", true), voice("es-voice", "es-ES", false)]
            }
        }

        let mut recorder = Recorder { spoken: Vec::new() };
        speak_auto(&mut recorder, "hola", "es", UtteranceConfig::new()).unwrap();
        assert_eq!(recorder.spoken.len(), 1);
        assert_eq!(recorder.spoken[0].config.voice_id.as_deref(), Some("es-voice"));
    }
}
