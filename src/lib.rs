//! Word-level language identification for code-switched documents.
//!
//! Each token is scored through a sliding window of its neighbours: every
//! window is classified by a [`LanguageOracle`], restricted to the possible
//! languages, and accumulated onto the tokens it covers. Tokens left with
//! several close candidates are settled by a vote using the oracle on the
//! bare token, a [`Dictionary`], or both.
//!
//! ```no_run
//! use rust_codeswitch::{DictionaryClient, IdentifyConfig, WhatlangOracle, identify};
//!
//! let config = IdentifyConfig::default();
//! let oracle = WhatlangOracle::new(&config.model_languages)?;
//! let dictionary = DictionaryClient::from_config(&config.dictionary);
//! let analysis = identify("hello le monde", &config, &oracle, &dictionary)?;
//! for label in &analysis.labels {
//!     println!("{}\t{}", label.surface, label.language);
//! }
//! # Ok::<(), rust_codeswitch::Error>(())
//! ```

pub mod config;
pub mod dictionary;
pub mod error;
pub mod oracle;
pub mod pipeline;
pub mod scoring;
pub mod server;
pub mod tokenize;
pub mod vote;
pub mod window;

#[cfg(feature = "python")]
mod python;

pub use config::{DictionaryConfig, IdentifyConfig, VoteMethod};
pub use dictionary::{Dictionary, DictionaryClient, Lexicon};
pub use error::{Error, Result};
pub use oracle::{Distribution, LanguageOracle, WhatlangOracle};
pub use pipeline::{Analysis, Decision, Identifier, TokenLabel, identify, write_labels};
pub use server::DictionaryServer;
