//! Viseme and subtitle timelines
//!
//! Everything here is timed relative to the start of the audio; the queue
//! shifts the entries onto the animation clock when playback begins.

use serde::{Deserialize, Serialize};

use marionette_anim::{AnimCommand, AnimationEntry, EntryOptions, EntryTag, Keyframe};

use crate::item::WordTimings;
use crate::lipsync::LipsyncTable;

/// Natural length of one viseme (ms); faster speech overdrives
const NATURAL_VISEME_MS: f64 = 150.0;
/// Visemes are never stretched beyond this (ms)
const MAX_VISEME_MS: f64 = 200.0;
const BASE_LEVEL: f32 = 0.6;
const OVERDRIVE_GAIN: f32 = 0.4;
/// Closed-lip shapes always close fully
const CLOSED_LEVEL: f32 = 0.9;
/// Default level of pre-supplied visemes
const DEFAULT_LEVEL: f32 = 0.8;

const RISE_MS: f64 = 60.0;
const HOLD_MS: f64 = 25.0;
const FALL_MS: f64 = 60.0;

/// One timed mouth shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viseme {
    pub name: String,
    pub start_ms: f64,
    pub duration_ms: f64,
    /// Peak weight; `None` uses the default level
    #[serde(default)]
    pub level: Option<f32>,
}

impl Viseme {
    pub fn new(name: impl Into<String>, start_ms: f64, duration_ms: f64) -> Self {
        Self {
            name: name.into(),
            start_ms,
            duration_ms,
            level: None,
        }
    }

    pub fn channel(&self) -> String {
        format!("viseme_{}", self.name)
    }

    fn peak(&self) -> f32 {
        match self.name.as_str() {
            "PP" | "FF" => CLOSED_LEVEL,
            _ => self.level.unwrap_or(DEFAULT_LEVEL),
        }
    }
}

/// Visemes for timed words through a lip-sync table.
///
/// Each word's viseme block is scaled into its allotted duration (capped at
/// `MAX_VISEME_MS` per viseme). When a word is spoken faster than its
/// natural viseme count allows, the level is raised.
pub fn visemes_from_words(words: &WordTimings, table: &dyn LipsyncTable, lang: &str) -> Vec<Viseme> {
    let mut out = Vec::new();
    for i in 0..words.len() {
        let (start, allotted) = (words.times[i], words.durations[i]);
        let lip = table.word_to_visemes(&words.words[i], lang);
        let units = lip.total() as f64;
        if lip.is_empty() || units <= 0.0 || allotted <= 0.0 {
            continue;
        }
        let n = lip.len() as f64;
        let natural = n * NATURAL_VISEME_MS;
        let overdrive = ((natural - allotted) / natural).clamp(0.0, 1.0) as f32;
        let level = BASE_LEVEL + OVERDRIVE_GAIN * overdrive;
        let block = allotted.min(n * MAX_VISEME_MS);
        let block_end = start + block;
        for j in 0..lip.len() {
            let (t, d) = (lip.times[j] as f64, lip.durations[j] as f64);
            let begin = (start + t / units * block).min(block_end);
            let end = (start + (t + d) / units * block).min(block_end);
            out.push(Viseme {
                name: lip.visemes[j].clone(),
                start_ms: begin,
                duration_ms: (end - begin).max(0.0),
                level: Some(level),
            });
        }
    }
    out
}

/// Rise/hold/fall envelope entries, clamped into `[0, total_ms]`
pub fn viseme_entries(visemes: &[Viseme], total_ms: f64) -> Vec<AnimationEntry> {
    let clamp = |t: f64| t.clamp(0.0, total_ms.max(0.0));
    visemes
        .iter()
        .filter(|v| v.duration_ms > 0.0)
        .map(|v| {
            let d = v.duration_ms;
            let t0 = clamp(v.start_ms - RISE_MS.min(2.0 * d / 3.0));
            let t1 = clamp(v.start_ms + HOLD_MS.min(d / 2.0)).max(t0);
            let t2 = clamp(v.start_ms + d + FALL_MS.min(d / 2.0)).max(t1);
            AnimationEntry::new("viseme", vec![t0, t1, t2], EntryOptions::tagged(EntryTag::Speech)).with_channel(
                v.channel(),
                vec![Keyframe::Anchor, Keyframe::Value(v.peak()), Keyframe::Value(0.0)],
            )
        })
        .collect()
}

/// One `subtitles` command per word at its start time
pub fn subtitle_entry(words: &WordTimings) -> Option<AnimationEntry> {
    if words.is_empty() {
        return None;
    }
    let n = words.len();
    let ts = words.times[..n].to_vec();
    let commands = words.words[..n]
        .iter()
        .map(|w| Keyframe::Command(AnimCommand::Subtitles(format!("{w} "))))
        .collect();
    Some(AnimationEntry::new("subtitles", ts, EntryOptions::tagged(EntryTag::Speech)).with_channel("subtitles", commands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lipsync::SimpleLipsync;
    use proptest::prelude::*;

    fn timings(words: &[&str], times: &[f64], durations: &[f64]) -> WordTimings {
        WordTimings {
            words: words.iter().map(|w| w.to_string()).collect(),
            times: times.to_vec(),
            durations: durations.to_vec(),
        }
    }

    #[test]
    fn test_envelope_shape() {
        let entries = viseme_entries(&[Viseme::new("aa", 0.0, 300.0), Viseme::new("PP", 300.0, 200.0)], 1200.0);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ts, vec![0.0, 25.0, 360.0]);
        assert_eq!(entries[1].ts, vec![240.0, 325.0, 560.0]);
        assert!(matches!(entries[1].channels["viseme_PP"][1], Keyframe::Value(v) if v == CLOSED_LEVEL));
        assert!(entries.iter().all(|e| e.options.tag == EntryTag::Speech));
    }

    #[test]
    fn test_fast_words_overdrive() {
        let table = SimpleLipsync;
        let slow = visemes_from_words(&timings(&["hello"], &[0.0], &[2000.0]), &table, "en");
        let fast = visemes_from_words(&timings(&["hello"], &[0.0], &[200.0]), &table, "en");
        let level = |v: &[Viseme]| v.iter().find(|x| x.name == "E").and_then(|x| x.level).unwrap();
        assert!(level(&fast) > level(&slow));
        assert_eq!(level(&slow), BASE_LEVEL);

        // Slow words are capped at MAX_VISEME_MS per viseme
        let last = slow.last().unwrap();
        assert!(last.start_ms + last.duration_ms <= slow.len() as f64 * MAX_VISEME_MS + 1e-9);
        assert!(slow.iter().all(|v| v.start_ms + v.duration_ms <= slow.len() as f64 * MAX_VISEME_MS + 1e-9));
        // Fast words fill exactly their allotted time
        let last = fast.last().unwrap();
        assert!((last.start_ms + last.duration_ms - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_subtitles_one_per_word() {
        let entry = subtitle_entry(&timings(&["a", "b"], &[0.0, 500.0], &[500.0, 300.0])).unwrap();
        assert_eq!(entry.ts, vec![0.0, 500.0]);
        let keyframes = &entry.channels["subtitles"];
        assert!(keyframes.iter().all(Keyframe::is_command));
        assert!(subtitle_entry(&WordTimings::default()).is_none());
    }

    proptest! {
        #[test]
        fn prop_word_visemes_stay_inside_block(
            word in prop::sample::select(vec!["hello", "world", "marionette", "a", "speech"]),
            start in 0.0f64..5000.0,
            allotted in 1.0f64..3000.0,
        ) {
            let visemes = visemes_from_words(&timings(&[word], &[start], &[allotted]), &SimpleLipsync, "en");
            let cap = start + allotted.min(visemes.len() as f64 * MAX_VISEME_MS);
            for v in &visemes {
                prop_assert!(v.start_ms >= start);
                prop_assert!(v.start_ms + v.duration_ms <= cap + 1e-9);
            }
        }

        #[test]
        fn prop_envelopes_stay_inside_audio(
            visemes in proptest::collection::vec((0.0f64..2000.0, 0.0f64..400.0), 0..20),
            total in 100.0f64..2000.0,
        ) {
            let visemes: Vec<Viseme> = visemes.into_iter().map(|(s, d)| Viseme::new("O", s, d)).collect();
            for entry in viseme_entries(&visemes, total) {
                prop_assert!(entry.ts.windows(2).all(|w| w[0] <= w[1]));
                prop_assert!(entry.ts.iter().all(|&t| (0.0..=total).contains(&t)));
                for keyframes in entry.channels.values() {
                    prop_assert_eq!(keyframes.len(), entry.ts.len());
                }
            }
        }
    }
}
