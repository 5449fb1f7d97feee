//! Speech items and TTS payloads

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use marionette_anim::CommandFn;
use marionette_core::{AnimError, AnimResult};

use crate::audio::AudioBuffer;
use crate::viseme::Viseme;

/// Named time point reported by the TTS service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timepoint {
    pub mark_name: String,
    pub time_seconds: f64,
}

/// TTS response: base64 audio plus word marks (`markName` = word index)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TtsPayload {
    pub audio_base64: String,
    pub timepoints: Vec<Timepoint>,
}

impl TtsPayload {
    pub fn from_json(json: &str) -> AnimResult<Self> {
        serde_json::from_str(json).map_err(|e| AnimError::InvalidPayload(e.to_string()))
    }

    pub fn audio_bytes(&self) -> AnimResult<Vec<u8>> {
        STANDARD
            .decode(self.audio_base64.trim())
            .map_err(|e| AnimError::InvalidPayload(format!("audio: {e}")))
    }

    /// Start of word `index` (ms), from the mark named after it
    pub fn word_start_ms(&self, index: usize) -> Option<f64> {
        let mark = index.to_string();
        self.timepoints
            .iter()
            .find(|tp| tp.mark_name == mark)
            .map(|tp| tp.time_seconds * 1000.0)
    }
}

/// Word timings (ms, relative to audio start)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WordTimings {
    pub words: Vec<String>,
    pub times: Vec<f64>,
    pub durations: Vec<f64>,
}

impl WordTimings {
    /// Words with start marks; each lasts until the next starts (the last until `total_ms`)
    pub fn from_marks(words: &[String], payload: &TtsPayload, total_ms: f64) -> Self {
        let mut timed: Vec<(String, f64)> = words
            .iter()
            .enumerate()
            .filter_map(|(i, w)| payload.word_start_ms(i).map(|t| (w.clone(), t)))
            .collect();
        timed.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut out = Self::default();
        for (i, (word, start)) in timed.iter().enumerate() {
            let end = timed.get(i + 1).map_or(total_ms, |next| next.1);
            out.words.push(word.clone());
            out.times.push(*start);
            out.durations.push((end - start).max(0.0));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.words.len().min(self.times.len()).min(self.durations.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One queued unit of speech
#[derive(Clone)]
pub enum SpeechItem {
    /// Text with its synthesized audio
    Text {
        text: String,
        tts: Option<TtsPayload>,
        /// Mood switched to when playback begins
        mood: Option<String>,
        lang: Option<String>,
    },
    /// Pre-rendered audio with visemes, or word timings to derive them from
    Audio {
        audio: AudioBuffer,
        visemes: Vec<Viseme>,
        words: Option<WordTimings>,
        mood: Option<String>,
    },
    Emoji(String),
    /// Pause (ms)
    Break(f64),
    Marker(CommandFn),
}

impl SpeechItem {
    pub fn text(text: impl Into<String>, tts: TtsPayload) -> Self {
        SpeechItem::Text {
            text: text.into(),
            tts: Some(tts),
            mood: None,
            lang: None,
        }
    }

    pub fn audio(audio: AudioBuffer, visemes: Vec<Viseme>) -> Self {
        SpeechItem::Audio {
            audio,
            visemes,
            words: None,
            mood: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SpeechItem::Text { .. } => "text",
            SpeechItem::Audio { .. } => "audio",
            SpeechItem::Emoji(_) => "emoji",
            SpeechItem::Break(_) => "break",
            SpeechItem::Marker(_) => "marker",
        }
    }
}

impl fmt::Debug for SpeechItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechItem::Text { text, .. } => write!(f, "Text({text:?})"),
            SpeechItem::Audio { audio, visemes, .. } => {
                write!(f, "Audio({}ms, {} visemes)", audio.duration_ms, visemes.len())
            }
            SpeechItem::Emoji(name) => write!(f, "Emoji({name})"),
            SpeechItem::Break(ms) => write!(f, "Break({ms}ms)"),
            SpeechItem::Marker(_) => f.write_str("Marker(..)"),
        }
    }
}

/// Split text into words for lip-sync and subtitles
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_json() {
        let json = r#"{
            "audioBase64": "AAEC",
            "timepoints": [{"markName": "0", "timeSeconds": 0.0}, {"markName": "1", "timeSeconds": 0.4}]
        }"#;
        let payload = TtsPayload::from_json(json).unwrap();
        assert_eq!(payload.audio_bytes().unwrap(), vec![0, 1, 2]);
        assert_eq!(payload.word_start_ms(1), Some(400.0));
        assert_eq!(payload.word_start_ms(2), None);
    }

    #[test]
    fn test_bad_payloads() {
        assert!(matches!(TtsPayload::from_json("{"), Err(AnimError::InvalidPayload(_))));
        let payload = TtsPayload {
            audio_base64: "not base64!".into(),
            timepoints: vec![],
        };
        assert!(matches!(payload.audio_bytes(), Err(AnimError::InvalidPayload(_))));
    }

    #[test]
    fn test_word_timings_from_marks() {
        let words = split_words("hello  brave world");
        let payload = TtsPayload {
            audio_base64: String::new(),
            timepoints: vec![
                Timepoint {
                    mark_name: "0".into(),
                    time_seconds: 0.1,
                },
                Timepoint {
                    mark_name: "2".into(),
                    time_seconds: 0.9,
                },
            ],
        };
        let timings = WordTimings::from_marks(&words, &payload, 1500.0);
        assert_eq!(timings.words, vec!["hello", "world"]);
        assert_eq!(timings.times, vec![100.0, 900.0]);
        assert_eq!(timings.durations, vec![800.0, 600.0]);
    }
}
