//! Python bindings.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::{IdentifyConfig, VoteMethod, parse_language_list};
use crate::dictionary::DictionaryClient;
use crate::oracle::WhatlangOracle;
use crate::pipeline::{Decision, TokenLabel, identify};
use crate::tokenize::Cleaner;

/// Token label returned to Python
#[pyclass]
#[derive(Clone)]
struct LabeledToken {
    #[pyo3(get)]
    token: String,
    #[pyo3(get)]
    language: String,
    #[pyo3(get)]
    decision: String,
    #[pyo3(get)]
    score: f64,
    #[pyo3(get)]
    candidates: Vec<(String, f64)>,
}

impl From<TokenLabel> for LabeledToken {
    fn from(label: TokenLabel) -> Self {
        let (decision, score) = match label.decision {
            Decision::Unambiguous => ("unambiguous", 0.0),
            Decision::Voted { score } => ("voted", score),
            Decision::Fallback => ("fallback", 0.0),
        };
        Self {
            token: label.surface,
            language: label.language,
            decision: decision.to_string(),
            score,
            candidates: label.candidates,
        }
    }
}

fn run(
    text: &str,
    languages: Option<&str>,
    window_radius: usize,
    filter_threshold: f64,
    gap: f64,
    vote: &str,
    dictionary: Option<String>,
) -> PyResult<Vec<TokenLabel>> {
    let to_py = |e: crate::error::Error| PyValueError::new_err(e.to_string());

    let mut config = IdentifyConfig {
        window_radius,
        filter_threshold,
        significance_gap: gap,
        vote_method: vote
            .parse::<VoteMethod>()
            .map_err(|e| to_py(e.into()))?,
        ..IdentifyConfig::default()
    };
    if let Some(list) = languages {
        config.languages = parse_language_list(list);
    }
    if let Some(address) = dictionary {
        config.dictionary.address = address;
    }

    let oracle = WhatlangOracle::new(&config.model_languages).map_err(|e| to_py(e.into()))?;
    let client = DictionaryClient::from_config(&config.dictionary);
    let analysis = identify(text, &config, &oracle, &client).map_err(to_py)?;
    Ok(analysis.labels)
}

/// Label every whitespace token of `text` with a language code
/// Returns: list of (token, language)
#[pyfunction]
#[pyo3(signature = (text, languages=None, window_radius=1, filter_threshold=0.0, gap=0.1, vote="dico", dictionary=None))]
fn identify_text(
    text: String,
    languages: Option<String>,
    window_radius: usize,
    filter_threshold: f64,
    gap: f64,
    vote: &str,
    dictionary: Option<String>,
) -> PyResult<Vec<(String, String)>> {
    let labels = run(
        &text,
        languages.as_deref(),
        window_radius,
        filter_threshold,
        gap,
        vote,
        dictionary,
    )?;
    Ok(labels
        .into_iter()
        .map(|label| (label.surface, label.language))
        .collect())
}

/// Same as identify_text, with candidates and decision details per token
#[pyfunction]
#[pyo3(signature = (text, languages=None, window_radius=1, filter_threshold=0.0, gap=0.1, vote="dico", dictionary=None))]
fn identify_tokens(
    text: String,
    languages: Option<String>,
    window_radius: usize,
    filter_threshold: f64,
    gap: f64,
    vote: &str,
    dictionary: Option<String>,
) -> PyResult<Vec<LabeledToken>> {
    let labels = run(
        &text,
        languages.as_deref(),
        window_radius,
        filter_threshold,
        gap,
        vote,
        dictionary,
    )?;
    Ok(labels.into_iter().map(LabeledToken::from).collect())
}

/// Strip non-alphabetic characters around a token
#[pyfunction]
fn clean_token(token: String) -> String {
    Cleaner::default().clean(&token)
}

#[pymodule]
fn rust_codeswitch(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(identify_text, m)?)?;
    m.add_function(wrap_pyfunction!(identify_tokens, m)?)?;
    m.add_function(wrap_pyfunction!(clean_token, m)?)?;
    m.add_class::<LabeledToken>()?;
    Ok(())
}
