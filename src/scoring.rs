//! Score handling: global filtering, recalibration, per-token accumulation
//! and thresholding.

use tracing::debug;

use crate::error::{Error, Result};
use crate::oracle::Distribution;

/// Outcome of the whole-document detection.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLanguages {
    /// Admissible languages that reached the filter threshold, in oracle
    /// order.
    pub possible: Vec<String>,
    /// Admissible language with the highest document-level probability,
    /// regardless of the threshold. `None` when all of them scored 0.
    pub best: Option<String>,
}

/// Restrict the document-level distribution to `admissible` languages
/// scoring at least `threshold`.
pub fn global_filter(
    raw: &Distribution,
    admissible: &[String],
    threshold: f64,
) -> Result<GlobalLanguages> {
    let mut possible = Vec::new();
    let mut best: Option<(&str, f64)> = None;

    for (lang, prob) in raw.iter() {
        if !admissible.iter().any(|code| code == lang) {
            continue;
        }
        if prob >= threshold {
            possible.push(lang.to_string());
        }
        if prob > best.map_or(0.0, |(_, top)| top) {
            best = Some((lang, prob));
        }
    }

    if possible.is_empty() {
        return Err(Error::NoPossibleLanguage {
            admissible: admissible.to_vec(),
            threshold,
        });
    }
    Ok(GlobalLanguages {
        possible,
        best: best.map(|(lang, _)| lang.to_string()),
    })
}

/// Restrict `raw` to `possible` languages and renormalize to sum 1.
///
/// With no mass left on the possible languages every one of them gets
/// `1/|possible|`.
pub fn recalibrate(raw: &Distribution, possible: &[String]) -> Distribution {
    let mut kept = raw.clone();
    kept.retain(|lang, _| possible.iter().any(|code| code == lang));

    let total = kept.total();
    if total > 0.0 {
        kept.scale(1.0 / total);
        kept
    } else {
        let share = 1.0 / possible.len() as f64;
        Distribution::from_pairs(possible.iter().map(|lang| (lang.as_str(), share)))
    }
}

/// Running per-token language totals across fragments.
#[derive(Debug, Clone)]
pub struct Accumulator {
    totals: Vec<Distribution>,
    window_len: usize,
}

impl Accumulator {
    pub fn new(tokens: usize, window_len: usize) -> Self {
        Self {
            totals: vec![Distribution::new(); tokens],
            window_len,
        }
    }

    /// Add a fragment's recalibrated scores to every position it covers.
    /// Repeated positions are credited once per occurrence.
    pub fn add(&mut self, scores: &Distribution, positions: &[usize]) {
        for (lang, prob) in scores.iter() {
            for &pos in positions {
                self.totals[pos].add(lang, prob);
            }
        }
    }

    /// Divide every total by the window length.
    pub fn finish(self) -> Vec<Distribution> {
        let factor = 1.0 / self.window_len as f64;
        self.totals
            .into_iter()
            .map(|mut dist| {
                dist.scale(factor);
                dist
            })
            .collect()
    }
}

/// Languages scoring within `gap` of the best one.
pub fn threshold(dist: &Distribution, gap: f64) -> Distribution {
    let Some((best, best_prob)) = dist.best() else {
        return Distribution::new();
    };
    debug!(best, best_prob, gap, "thresholding");
    let floor = best_prob - gap;
    let mut kept = dist.clone();
    kept.retain(|_, prob| prob >= floor);
    kept
}
