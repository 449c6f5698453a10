//! Whole-document identification.
//!
//! Three sequential phases:
//!
//! 1. global filter over the normalized document;
//! 2. one fragment per token, classified in parallel, then folded in
//!    document order into per-token totals;
//! 3. per token, thresholding and (when still ambiguous) voting.

use std::io::{self, Write};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{IdentifyConfig, normalize_language_code};
use crate::dictionary::Dictionary;
use crate::error::Result;
use crate::oracle::{Distribution, LanguageOracle};
use crate::scoring::{Accumulator, GlobalLanguages, global_filter, recalibrate, threshold};
use crate::tokenize::{Cleaner, Document, tokenize};
use crate::vote::Voter;
use crate::window::build_fragment;

/// How a token's language was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Only one language survived thresholding.
    Unambiguous,
    /// The voting strategy chose among several candidates.
    Voted { score: f64 },
    /// Voting was inconclusive; the best candidate was kept.
    Fallback,
}

/// Final label of one token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLabel {
    pub index: usize,
    pub surface: String,
    pub language: String,
    /// Thresholded candidates, best first.
    pub candidates: Vec<(String, f64)>,
    pub decision: Decision,
}

/// Result of identifying a document.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub possible_languages: Vec<String>,
    pub best_global: Option<String>,
    pub labels: Vec<TokenLabel>,
}

/// Identifies the language of every token of a document.
pub struct Identifier<'a, O: ?Sized, D: ?Sized> {
    config: IdentifyConfig,
    /// Configured subset, or every oracle label when none is set.
    admissible: Vec<String>,
    oracle: &'a O,
    dictionary: &'a D,
    cleaner: Cleaner,
}

impl<'a, O, D> Identifier<'a, O, D>
where
    O: LanguageOracle + ?Sized,
    D: Dictionary + ?Sized,
{
    /// Validate a normalized copy of `config` and resolve the admissible
    /// languages against the oracle's labels.
    pub fn new(config: &IdentifyConfig, oracle: &'a O, dictionary: &'a D) -> Result<Self> {
        let mut config = config.clone();
        config.normalize();
        config.validate()?;
        let cleaner = Cleaner::new(&config.alphabet)?;

        let admissible = if config.languages.is_empty() {
            oracle
                .labels()
                .iter()
                .map(|code| normalize_language_code(code))
                .collect()
        } else {
            config.languages.clone()
        };
        debug!(?admissible, "admissible languages");

        Ok(Self {
            config,
            admissible,
            oracle,
            dictionary,
            cleaner,
        })
    }

    pub fn identify(&self, text: &str) -> Result<Analysis> {
        let doc = tokenize(text, &self.cleaner);
        if doc.is_empty() {
            info!("document has no tokens");
            return Ok(Analysis::default());
        }

        let global = self.global_languages(&doc)?;
        info!(
            tokens = doc.len(),
            window = self.config.window_len(),
            possible = ?global.possible,
            best_global = ?global.best,
            "global detection done"
        );

        let scores = self.token_scores(&doc, &global.possible);
        let voter = Voter::new(
            self.oracle,
            self.dictionary,
            &self.cleaner,
            global.best.as_deref(),
        );
        let labels = doc
            .tokens
            .iter()
            .zip(&scores)
            .map(|(token, dist)| self.label(&voter, token.index, &token.surface, dist))
            .collect();

        Ok(Analysis {
            possible_languages: global.possible,
            best_global: global.best,
            labels,
        })
    }

    /// Run the oracle on the whole document and filter the result.
    pub fn global_languages(&self, doc: &Document) -> Result<GlobalLanguages> {
        let raw = self.oracle.classify(&doc.text);
        debug!(?raw, "global distribution");
        global_filter(
            &raw,
            &self.admissible,
            self.config.filter_threshold,
        )
    }

    /// Normalized per-token scores from every fragment covering each token.
    pub fn token_scores(&self, doc: &Document, possible: &[String]) -> Vec<Distribution> {
        let oracle = self.oracle;
        let tokens = &doc.tokens;
        let radius = self.config.window_radius;

        let fragments: Vec<_> = (0..tokens.len())
            .into_par_iter()
            .map(|pos| {
                let fragment = build_fragment(tokens, pos, radius);
                let raw = oracle.classify(&fragment.text);
                let scores = recalibrate(&raw, possible);
                debug!(fragment = %fragment.text, ?scores, "fragment scored");
                (fragment.positions, scores)
            })
            .collect();

        let mut acc = Accumulator::new(tokens.len(), self.config.window_len());
        for (positions, scores) in &fragments {
            acc.add(scores, positions);
        }
        acc.finish()
    }

    fn label(
        &self,
        voter: &Voter<'_, O, D>,
        index: usize,
        surface: &str,
        dist: &Distribution,
    ) -> TokenLabel {
        let kept = threshold(dist, self.config.significance_gap);
        let candidates = kept.ranked();
        // Every token is covered by its own fragment, and recalibrated
        // fragments are never empty.
        let best = candidates
            .first()
            .map(|(lang, _)| lang.clone())
            .unwrap_or_default();

        let (language, decision) = if candidates.len() > 1 {
            let viable: Vec<String> = kept.languages().map(str::to_string).collect();
            let vote = voter.vote(self.config.vote_method, surface, &viable);
            match vote.winner() {
                Some(lang) => (lang.to_string(), Decision::Voted { score: vote.score }),
                None => (best, Decision::Fallback),
            }
        } else {
            (best, Decision::Unambiguous)
        };

        debug!(index, surface, language = %language, ?candidates, ?decision, "token labelled");
        TokenLabel {
            index,
            surface: surface.to_string(),
            language,
            candidates,
            decision,
        }
    }
}

/// Identify `text` with the given collaborators.
pub fn identify<O, D>(
    text: &str,
    config: &IdentifyConfig,
    oracle: &O,
    dictionary: &D,
) -> Result<Analysis>
where
    O: LanguageOracle + ?Sized,
    D: Dictionary + ?Sized,
{
    Identifier::new(config, oracle, dictionary)?.identify(text)
}

/// Write `surface\tlanguage` lines; with `details`, the thresholded
/// candidates follow as `lang (prob)` columns.
pub fn write_labels<W: Write>(mut out: W, labels: &[TokenLabel], details: bool) -> io::Result<()> {
    for label in labels {
        write!(out, "{}\t{}", label.surface, label.language)?;
        if details {
            for (lang, prob) in &label.candidates {
                write!(out, "\t{lang} ({prob:.3})")?;
            }
        }
        writeln!(out)?;
    }
    out.flush()
}
