//! Diagnostic error types for the code-switching identifier.
//!
//! Every concern has its own enum with miette `#[diagnostic]` derives; the
//! top-level [`Error`] wraps them so the CLI can render a single report.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Server(#[from] ServerError),

    #[error("no possible language left after global filtering (admissible: {admissible:?}, threshold: {threshold})")]
    #[diagnostic(
        code(codeswitch::no_possible_language),
        help(
            "None of the admissible languages reached the global filter threshold. \
             Lower the threshold (-f 0 keeps every language) or widen the language subset."
        )
    )]
    NoPossibleLanguage {
        admissible: Vec<String>,
        threshold: f64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("{name} must be within [{min}, {max}], got {value}")]
    #[diagnostic(
        code(codeswitch::config::out_of_range),
        help("The global filter threshold is a probability in [0, 1], the gap a finite value >= 0, and the window radius at most 1024.")
    )]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("the model language list is empty")]
    #[diagnostic(
        code(codeswitch::config::no_languages),
        help("Set `model_languages` in the settings file to the ISO 639-3 codes the oracle should consider.")
    )]
    NoLanguages,

    #[error("unknown vote method: \"{name}\"")]
    #[diagnostic(
        code(codeswitch::config::vote_method),
        help("Valid vote methods are \"lgid\" (oracle only), \"dico\" (dictionary only) and \"full\" (both).")
    )]
    UnknownVoteMethod { name: String },

    #[error("alphabet produced an invalid pattern")]
    #[diagnostic(code(codeswitch::config::alphabet))]
    Alphabet {
        #[source]
        source: regex::Error,
    },

    #[error("failed to read settings file {}", path.display())]
    #[diagnostic(code(codeswitch::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file")]
    #[diagnostic(
        code(codeswitch::config::parse),
        help("The settings file is TOML; see the `IdentifyConfig` fields for the accepted keys.")
    )]
    Parse {
        #[source]
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// Oracle errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OracleError {
    #[error("language \"{code}\" is not supported by the oracle")]
    #[diagnostic(
        code(codeswitch::oracle::unsupported),
        help("Use ISO 639-3 codes known to whatlang, e.g. \"eng\", \"fra\", \"deu\".")
    )]
    UnsupportedLanguage { code: String },

    #[error("the oracle needs at least one label")]
    #[diagnostic(code(codeswitch::oracle::no_labels))]
    NoLabels,
}

// ---------------------------------------------------------------------------
// Dictionary errors
// ---------------------------------------------------------------------------

/// Failures of a single dictionary lookup. The voter recovers from all of
/// them by treating the lookup as "no match".
#[derive(Debug, Error, Diagnostic)]
pub enum DictionaryError {
    #[error("dictionary service at {address} failed")]
    #[diagnostic(
        code(codeswitch::dictionary::io),
        help("Start the dictionary server (`codeswitch serve <DIR>`) or point --dictionary at a running one.")
    )]
    Io {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dictionary request is {len} characters long, the limit is {max}")]
    #[diagnostic(code(codeswitch::dictionary::request_too_long))]
    RequestTooLong { len: usize, max: usize },

    #[error("malformed dictionary request: {line:?}")]
    #[diagnostic(code(codeswitch::dictionary::bad_request))]
    MalformedRequest { line: String },

    #[error("dictionary service sent an empty response")]
    #[diagnostic(code(codeswitch::dictionary::empty_response))]
    EmptyResponse,

    #[error("malformed dictionary response: {response:?}")]
    #[diagnostic(
        code(codeswitch::dictionary::bad_response),
        help("The service must answer with a JSON array of language codes, e.g. [\"fra\"].")
    )]
    MalformedResponse {
        response: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read lexicon file {}", path.display())]
    #[diagnostic(code(codeswitch::dictionary::lexicon_read))]
    LexiconRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build Hunspell dictionary for \"{language}\": {message}")]
    #[diagnostic(code(codeswitch::dictionary::lexicon_build))]
    LexiconBuild { language: String, message: String },

    #[error("lexicon directory not found: {}", path.display())]
    #[diagnostic(code(codeswitch::dictionary::lexicon_dir))]
    LexiconDirMissing { path: PathBuf },
}

// ---------------------------------------------------------------------------
// Dictionary server errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ServerError {
    #[error("failed to bind dictionary server to {address}")]
    #[diagnostic(
        code(codeswitch::server::bind),
        help("Another process may already listen on this port; pick another with --listen.")
    )]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dictionary server I/O failed")]
    #[diagnostic(code(codeswitch::server::io))]
    Io(#[from] std::io::Error),
}
