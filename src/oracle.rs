//! Language-identification oracle and score distributions.
//!
//! The pipeline only needs "classify text into ranked language
//! probabilities", expressed by [`LanguageOracle`]. [`WhatlangOracle`] is the
//! model-backed implementation.

use whatlang::{Detector, Lang};

use crate::error::OracleError;

/// Language code to non-negative score, in insertion order.
///
/// Ties are resolved toward the earliest inserted language, which keeps
/// every "best language" decision deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    entries: Vec<(String, f64)>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut dist = Self::new();
        for (lang, value) in pairs {
            dist.add(&lang.into(), value);
        }
        dist
    }

    pub fn get(&self, lang: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(code, _)| code == lang)
            .map(|(_, value)| *value)
    }

    /// Add `value` to `lang`, inserting it at the end when absent.
    pub fn add(&mut self, lang: &str, value: f64) {
        match self.entries.iter_mut().find(|(code, _)| code == lang) {
            Some((_, total)) => *total += value,
            None => self.entries.push((lang.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(code, value)| (code.as_str(), *value))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, value)| value).sum()
    }

    /// First language with the maximal score.
    pub fn best(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (code, value) in self.iter() {
            if best.is_none_or(|(_, top)| value > top) {
                best = Some((code, value));
            }
        }
        best
    }

    /// Keep only the entries matching `keep`, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, f64) -> bool) {
        self.entries.retain(|(code, value)| keep(code, *value));
    }

    /// Multiply every score by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for (_, value) in &mut self.entries {
            *value *= factor;
        }
    }

    /// Entries by descending score; equal scores keep insertion order.
    pub fn ranked(&self) -> Vec<(String, f64)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// A language-identification capability.
///
/// Implementations must be deterministic for a given text and return
/// non-negative scores summing to 1 over their label set. `Sync` so fragment
/// classification can run in parallel.
pub trait LanguageOracle: Sync {
    /// Codes the oracle can return.
    fn labels(&self) -> Vec<String>;

    fn classify(&self, text: &str) -> Distribution;
}

/// Oracle backed by whatlang's trigram model, restricted to a label set.
///
/// whatlang reports only its best guess and a confidence, so the full
/// distribution is built by repeated detection: the detected language takes
/// its confidence-weighted share of the remaining mass, is removed from the
/// allowlist, and detection reruns on the rest.
#[derive(Debug, Clone)]
pub struct WhatlangOracle {
    langs: Vec<Lang>,
}

impl WhatlangOracle {
    pub fn new<S: AsRef<str>>(codes: &[S]) -> Result<Self, OracleError> {
        let mut langs = Vec::with_capacity(codes.len());
        for code in codes {
            let code = code.as_ref();
            let lang = Lang::from_code(code).ok_or_else(|| OracleError::UnsupportedLanguage {
                code: code.to_string(),
            })?;
            if !langs.contains(&lang) {
                langs.push(lang);
            }
        }
        if langs.is_empty() {
            return Err(OracleError::NoLabels);
        }
        Ok(Self { langs })
    }
}

impl LanguageOracle for WhatlangOracle {
    fn labels(&self) -> Vec<String> {
        self.langs.iter().map(|lang| lang.code().to_string()).collect()
    }

    fn classify(&self, text: &str) -> Distribution {
        let mut remaining = self.langs.clone();
        let mut mass = 1.0;
        let mut scores: Vec<(Lang, f64)> = Vec::with_capacity(remaining.len());

        while remaining.len() > 1 {
            let detector = Detector::with_allowlist(remaining.clone());
            let Some(info) = detector.detect(text) else {
                break;
            };
            let Some(pos) = remaining.iter().position(|lang| *lang == info.lang()) else {
                break;
            };
            let uniform = 1.0 / remaining.len() as f64;
            let confidence = info.confidence().clamp(0.0, 1.0);
            let share = mass * (confidence + (1.0 - confidence) * uniform);
            scores.push((remaining.remove(pos), share));
            mass -= share;
        }

        // Undetectable remainder (or the last language) splits what is left.
        let uniform = mass / remaining.len() as f64;
        scores.extend(remaining.into_iter().map(|lang| (lang, uniform)));

        let dist = Distribution::from_pairs(
            scores
                .into_iter()
                .map(|(lang, score)| (lang.code(), score.max(0.0))),
        );
        Distribution::from_pairs(dist.ranked())
    }
}
