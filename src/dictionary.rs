//! Dictionary lookups: which candidate languages know a word.
//!
//! Two implementations of [`Dictionary`]:
//!
//! - [`DictionaryClient`] talks to a dictionary service over the line
//!   protocol (one connection per lookup, bounded timeouts);
//! - [`Lexicon`] holds per-language Hunspell dictionaries or word lists in
//!   memory, and is what the dictionary server answers from.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};
use zspell::Dictionary as Hunspell;

use crate::config::DictionaryConfig;
use crate::error::DictionaryError;

/// Command understood by the dictionary service.
pub const LOOKUP_COMMAND: &str = "word_possibleLanguages";

/// Longest request line the service accepts, newline excluded.
pub const MAX_REQUEST_LEN: usize = 2048;

/// Responses longer than this are cut off (and will fail to parse).
const MAX_RESPONSE_LEN: u64 = 64 * 1024;

/// Answers "which of these languages contain this word".
pub trait Dictionary {
    fn lookup(&self, word: &str, candidates: &[String])
    -> Result<BTreeSet<String>, DictionaryError>;
}

impl<D: Dictionary + ?Sized> Dictionary for &D {
    fn lookup(
        &self,
        word: &str,
        candidates: &[String],
    ) -> Result<BTreeSet<String>, DictionaryError> {
        (**self).lookup(word, candidates)
    }
}

// =============================================================================
// Wire protocol
// =============================================================================

/// ` word_possibleLanguages::<word>::<lang,lang>`, without the newline.
pub fn format_request(word: &str, candidates: &[String]) -> Result<String, DictionaryError> {
    let request = format!(" {LOOKUP_COMMAND}::{word}::{}", candidates.join(","));
    let len = request.chars().count();
    if len > MAX_REQUEST_LEN {
        return Err(DictionaryError::RequestTooLong {
            len,
            max: MAX_REQUEST_LEN,
        });
    }
    Ok(request)
}

/// Split a request line into the word and the requested languages.
pub fn parse_request(line: &str) -> Result<(String, Vec<String>), DictionaryError> {
    let malformed = || DictionaryError::MalformedRequest {
        line: line.to_string(),
    };
    let body = line.trim_end_matches(['\r', '\n']).trim_start();
    let mut parts = body.splitn(3, "::");
    if parts.next() != Some(LOOKUP_COMMAND) {
        return Err(malformed());
    }
    let word = parts.next().ok_or_else(malformed)?;
    let langs = parts.next().ok_or_else(malformed)?;
    let langs = langs
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect();
    Ok((word.to_string(), langs))
}

/// Parse the JSON array of language codes sent back by the service.
pub fn parse_response(response: &str) -> Result<Vec<String>, DictionaryError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(DictionaryError::EmptyResponse);
    }
    serde_json::from_str(trimmed).map_err(|source| DictionaryError::MalformedResponse {
        response: trimmed.to_string(),
        source,
    })
}

// =============================================================================
// Network client
// =============================================================================

/// Client for a remote dictionary service.
#[derive(Debug, Clone)]
pub struct DictionaryClient {
    address: String,
    timeout: Duration,
}

impl DictionaryClient {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub fn from_config(config: &DictionaryConfig) -> Self {
        Self::new(config.address.clone(), config.timeout())
    }

    fn io_error(&self, source: std::io::Error) -> DictionaryError {
        DictionaryError::Io {
            address: self.address.clone(),
            source,
        }
    }

    fn connect(&self) -> Result<TcpStream, DictionaryError> {
        let mut last_err = None;
        for addr in self.address.to_socket_addrs().map_err(|e| self.io_error(e))? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(self.io_error(last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "address resolved to nothing")
        })))
    }

    /// One request, one response line. The stream is closed on return.
    fn exchange(&self, request: &str) -> Result<String, DictionaryError> {
        let mut stream = self.connect()?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|e| self.io_error(e))?;

        stream
            .write_all(format!("{request}\n").as_bytes())
            .and_then(|()| stream.flush())
            .map_err(|e| self.io_error(e))?;

        let mut response = String::new();
        BufReader::new((&stream).take(MAX_RESPONSE_LEN))
            .read_line(&mut response)
            .map_err(|e| self.io_error(e))?;
        Ok(response)
    }
}

impl Dictionary for DictionaryClient {
    fn lookup(
        &self,
        word: &str,
        candidates: &[String],
    ) -> Result<BTreeSet<String>, DictionaryError> {
        let request = format_request(word, candidates)?;
        debug!(address = %self.address, request = %request, "dictionary request");
        let response = self.exchange(&request)?;
        let langs = parse_response(&response)?;
        debug!(?langs, "dictionary response");
        Ok(langs.into_iter().collect())
    }
}

// =============================================================================
// In-memory lexicon
// =============================================================================

/// Words of one language.
enum WordSource {
    Hunspell(Hunspell),
    /// Plain word list (for languages whose Hunspell files zspell can't read).
    WordList(HashSet<String>),
}

impl WordSource {
    fn check_exact(&self, word: &str) -> bool {
        match self {
            Self::Hunspell(dict) => dict.check_word(word),
            Self::WordList(words) => words.contains(word),
        }
    }
}

/// Per-language dictionaries held in memory.
#[derive(Default)]
pub struct Lexicon {
    languages: Vec<(String, WordSource)>,
}

impl std::fmt::Debug for Lexicon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexicon")
            .field("languages", &self.languages().collect::<Vec<_>>())
            .finish()
    }
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load dictionaries for `codes` from `dir`.
    ///
    /// `<code>.aff` + `<code>.dic` are read as Hunspell; otherwise
    /// `<code>_words.txt` as a word list. Languages with neither are skipped
    /// with a warning.
    pub fn load(dir: &Path, codes: &[String]) -> Result<Self, DictionaryError> {
        if !dir.is_dir() {
            return Err(DictionaryError::LexiconDirMissing {
                path: dir.to_path_buf(),
            });
        }

        let mut lexicon = Self::new();
        for code in codes {
            if let Some(dict) = load_hunspell(dir, code)? {
                lexicon.languages.push((code.clone(), WordSource::Hunspell(dict)));
            } else if let Some(words) = load_word_list(dir, code)? {
                lexicon.languages.push((code.clone(), WordSource::WordList(words)));
            } else {
                warn!(language = %code, dir = %dir.display(), "no dictionary found");
            }
        }
        info!("{}", lexicon.stats());
        Ok(lexicon)
    }

    /// Add (or extend) a word list for `code`.
    pub fn insert_words<I, S>(&mut self, code: &str, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = words.into_iter().map(Into::into);
        let Some(pos) = self.languages.iter().position(|(lang, _)| lang == code) else {
            self.languages
                .push((code.to_string(), WordSource::WordList(words.collect())));
            return;
        };
        match &mut self.languages[pos].1 {
            WordSource::WordList(existing) => existing.extend(words),
            source => {
                warn!(language = %code, "replacing Hunspell dictionary with a word list");
                *source = WordSource::WordList(words.collect());
            }
        }
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.iter().map(|(code, _)| code.as_str())
    }

    /// Whether `code`'s dictionary contains `word`, as written or lowercased.
    pub fn check(&self, code: &str, word: &str) -> bool {
        let Some((_, source)) = self.languages.iter().find(|(lang, _)| lang == code) else {
            return false;
        };
        if source.check_exact(word) {
            return true;
        }
        let lower = word.to_lowercase();
        lower != word && source.check_exact(&lower)
    }

    pub fn stats(&self) -> String {
        let parts: Vec<String> = self
            .languages
            .iter()
            .map(|(code, source)| match source {
                WordSource::Hunspell(_) => format!("{code}=hunspell"),
                WordSource::WordList(words) => format!("{code}={} words", words.len()),
            })
            .collect();
        format!("Dictionaries loaded: {}", parts.join(", "))
    }
}

impl Dictionary for Lexicon {
    fn lookup(
        &self,
        word: &str,
        candidates: &[String],
    ) -> Result<BTreeSet<String>, DictionaryError> {
        Ok(candidates
            .iter()
            .filter(|code| self.check(code, word))
            .cloned()
            .collect())
    }
}

fn read_file(path: &Path) -> Result<String, DictionaryError> {
    fs::read_to_string(path).map_err(|source| DictionaryError::LexiconRead {
        path: path.to_path_buf(),
        source,
    })
}

fn load_hunspell(dir: &Path, code: &str) -> Result<Option<Hunspell>, DictionaryError> {
    let aff_path = dir.join(format!("{code}.aff"));
    let dic_path = dir.join(format!("{code}.dic"));
    if !aff_path.exists() || !dic_path.exists() {
        return Ok(None);
    }

    let aff_content = read_file(&aff_path)?;
    let dic_content = read_file(&dic_path)?;
    let dict = zspell::builder()
        .config_str(&aff_content)
        .dict_str(&dic_content)
        .build()
        .map_err(|e| DictionaryError::LexiconBuild {
            language: code.to_string(),
            message: e.to_string(),
        })?;
    debug!(language = %code, "loaded Hunspell dictionary");
    Ok(Some(dict))
}

fn load_word_list(dir: &Path, code: &str) -> Result<Option<HashSet<String>>, DictionaryError> {
    let path = dir.join(format!("{code}_words.txt"));
    if !path.exists() {
        return Ok(None);
    }
    let words: HashSet<String> = read_file(&path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    debug!(language = %code, words = words.len(), "loaded word list");
    Ok(Some(words))
}
