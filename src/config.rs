//! Identification settings.
//!
//! [`IdentifyConfig`] is built once (defaults, optional TOML file, CLI
//! overrides), validated, then shared read-only by every pipeline stage.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tokenize::DEFAULT_ALPHABET;

/// Languages the oracle scores by default (ISO 639-3).
pub const DEFAULT_MODEL_LANGUAGES: &[&str] =
    &["deu", "eng", "fra", "ita", "nld", "por", "ron", "spa"];

/// Default address of the dictionary service.
pub const DEFAULT_DICTIONARY_ADDRESS: &str = "127.0.0.1:1112";

const DEFAULT_TIMEOUT_MS: u64 = 3_000;

/// Largest accepted window radius.
pub const MAX_WINDOW_RADIUS: usize = 1024;

/// ISO 639-1 to ISO 639-3 for the languages the tool is commonly run with.
const LONG_CODES: &[(&str, &str)] = &[
    ("bg", "bul"),
    ("co", "cos"),
    ("cs", "ces"),
    ("da", "dan"),
    ("de", "deu"),
    ("el", "ell"),
    ("en", "eng"),
    ("es", "spa"),
    ("fi", "fin"),
    ("fr", "fra"),
    ("hu", "hun"),
    ("it", "ita"),
    ("lt", "lit"),
    ("nl", "nld"),
    ("pl", "pol"),
    ("pt", "por"),
    ("ro", "ron"),
    ("sv", "swe"),
];

/// Lowercase a language code and expand known two-letter codes to ISO 639-3.
pub fn normalize_language_code(code: &str) -> String {
    let code = code.trim().to_lowercase();
    LONG_CODES
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, long)| (*long).to_string())
        .unwrap_or(code)
}

/// Parse a comma-separated language list (`"en,fra, deu"`).
pub fn parse_language_list(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|code| !code.trim().is_empty())
        .map(normalize_language_code)
        .collect()
}

/// Strategy used when several languages survive thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoteMethod {
    /// Classify the isolated token with the oracle.
    #[serde(rename = "lgid")]
    Oracle,
    /// Ask the dictionary service which candidate knows the token.
    #[default]
    #[serde(rename = "dico")]
    Dictionary,
    /// Both, with the global best language breaking disagreements.
    #[serde(rename = "full")]
    Combined,
}

impl FromStr for VoteMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lgid" | "oracle" => Ok(Self::Oracle),
            "dico" | "dictionary" => Ok(Self::Dictionary),
            "full" | "combined" => Ok(Self::Combined),
            other => Err(ConfigError::UnknownVoteMethod {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for VoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Oracle => "lgid",
            Self::Dictionary => "dico",
            Self::Combined => "full",
        })
    }
}

/// Where and how to reach the dictionary service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    pub address: String,
    /// Applied to connect, write and read separately.
    pub timeout_ms: u64,
}

impl DictionaryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DICTIONARY_ADDRESS.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyConfig {
    /// Tokens taken on each side of the target; the window holds `2r+1`.
    pub window_radius: usize,
    /// Minimum global probability for a language to stay possible.
    pub filter_threshold: f64,
    /// Margin below the best score within which candidates stay viable.
    pub significance_gap: f64,
    pub vote_method: VoteMethod,
    /// Languages the bundled whatlang oracle is built with.
    pub model_languages: Vec<String>,
    /// Admissible subset; empty means every label of the oracle in use.
    pub languages: Vec<String>,
    pub alphabet: String,
    pub dictionary: DictionaryConfig,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            window_radius: 1,
            filter_threshold: 0.0,
            significance_gap: 0.1,
            vote_method: VoteMethod::default(),
            model_languages: DEFAULT_MODEL_LANGUAGES
                .iter()
                .map(|code| code.to_string())
                .collect(),
            languages: Vec::new(),
            alphabet: DEFAULT_ALPHABET.to_string(),
            dictionary: DictionaryConfig::default(),
        }
    }
}

impl IdentifyConfig {
    /// Number of tokens in a fragment.
    pub fn window_len(&self) -> usize {
        2 * self.window_radius + 1
    }

    /// Normalize language codes in place.
    pub fn normalize(&mut self) {
        for code in self.model_languages.iter_mut().chain(self.languages.iter_mut()) {
            *code = normalize_language_code(code);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_radius > MAX_WINDOW_RADIUS {
            return Err(ConfigError::OutOfRange {
                name: "window_radius",
                value: self.window_radius as f64,
                min: 0.0,
                max: MAX_WINDOW_RADIUS as f64,
            });
        }
        if !(0.0..=1.0).contains(&self.filter_threshold) {
            return Err(ConfigError::OutOfRange {
                name: "filter_threshold",
                value: self.filter_threshold,
                min: 0.0,
                max: 1.0,
            });
        }
        if !self.significance_gap.is_finite() || self.significance_gap < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "significance_gap",
                value: self.significance_gap,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        if self.model_languages.is_empty() {
            return Err(ConfigError::NoLanguages);
        }
        Ok(())
    }

    /// Parse, normalize and validate a TOML settings document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|source| ConfigError::Parse { source })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
