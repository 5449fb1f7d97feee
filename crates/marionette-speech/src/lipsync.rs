//! Lip-sync tables
//!
//! Phoneme processing is pluggable. A table maps a word to visemes with
//! relative start times and durations in arbitrary units; the viseme
//! builder scales them to the word's real duration.

use tracing::trace;

/// Visemes of one word, timed in table units
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LipsyncResult {
    pub visemes: Vec<String>,
    pub times: Vec<f32>,
    pub durations: Vec<f32>,
}

impl LipsyncResult {
    fn push(&mut self, viseme: &str, duration: f32) {
        let t = self.total();
        // Repeated mouth shapes merge into one longer viseme
        if self.visemes.last().map(String::as_str) == Some(viseme) {
            if let Some(d) = self.durations.last_mut() {
                *d += duration;
            }
            return;
        }
        self.visemes.push(viseme.to_string());
        self.times.push(t);
        self.durations.push(duration);
    }

    /// Length in table units
    pub fn total(&self) -> f32 {
        match (self.times.last(), self.durations.last()) {
            (Some(t), Some(d)) => t + d,
            _ => 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.visemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visemes.is_empty()
    }
}

/// Word to viseme lookup
pub trait LipsyncTable {
    fn word_to_visemes(&self, word: &str, lang: &str) -> LipsyncResult;
}

/// Spelling-based table for English-like orthography
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleLipsync;

impl SimpleLipsync {
    const VOWEL: f32 = 2.0;
    const CONSONANT: f32 = 1.0;

    fn letter(c: char) -> Option<(&'static str, f32)> {
        let v = match c {
            'a' => ("aa", Self::VOWEL),
            'e' => ("E", Self::VOWEL),
            'i' | 'y' => ("I", Self::VOWEL),
            'o' => ("O", Self::VOWEL),
            'u' | 'w' => ("U", Self::VOWEL),
            'b' | 'm' | 'p' => ("PP", Self::CONSONANT),
            'f' | 'v' => ("FF", Self::CONSONANT),
            't' | 'd' => ("DD", Self::CONSONANT),
            'k' | 'g' | 'c' | 'q' | 'x' => ("kk", Self::CONSONANT),
            'j' => ("CH", Self::CONSONANT),
            's' | 'z' => ("SS", Self::CONSONANT),
            'n' | 'l' => ("nn", Self::CONSONANT),
            'r' => ("RR", Self::CONSONANT),
            _ => return None,
        };
        Some(v)
    }
}

impl LipsyncTable for SimpleLipsync {
    fn word_to_visemes(&self, word: &str, lang: &str) -> LipsyncResult {
        let chars: Vec<char> = word.to_lowercase().chars().filter(|c| c.is_alphabetic()).collect();
        let mut out = LipsyncResult::default();
        let mut i = 0;
        while i < chars.len() {
            let pair = (chars[i], chars.get(i + 1).copied());
            let digraph = match pair {
                ('t', Some('h')) => Some("TH"),
                ('c' | 's', Some('h')) => Some("CH"),
                _ => None,
            };
            if let Some(viseme) = digraph {
                out.push(viseme, Self::CONSONANT);
                i += 2;
                continue;
            }
            if let Some((viseme, duration)) = Self::letter(chars[i]) {
                out.push(viseme, duration);
            }
            i += 1;
        }
        trace!(word, lang, visemes = out.len(), "lipsync");
        out
    }
}
