//! End-to-end tests for document identification.
//!
//! The oracle is a lookup table so results are deterministic; dictionaries
//! are either in-memory lexicons served over TCP or a client pointed at a
//! closed port.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rust_codeswitch::error::ServerError;
use rust_codeswitch::{
    Decision, DictionaryClient, DictionaryServer, Distribution, Error, IdentifyConfig,
    LanguageOracle, Lexicon, VoteMethod, identify, write_labels,
};

/// Returns a fixed distribution per exact text, uniform otherwise.
struct TableOracle {
    labels: Vec<String>,
    table: HashMap<String, Vec<(String, f64)>>,
}

impl TableOracle {
    fn new(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            table: HashMap::new(),
        }
    }

    fn with(mut self, text: &str, scores: &[(&str, f64)]) -> Self {
        let scores = scores.iter().map(|(l, p)| (l.to_string(), *p)).collect();
        self.table.insert(text.to_string(), scores);
        self
    }
}

impl LanguageOracle for TableOracle {
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn classify(&self, text: &str) -> Distribution {
        match self.table.get(text) {
            Some(scores) => Distribution::from_pairs(scores.clone()),
            None => {
                let share = 1.0 / self.labels.len() as f64;
                Distribution::from_pairs(self.labels.iter().map(|l| (l.clone(), share)))
            }
        }
    }
}

fn config(languages: &[&str], radius: usize, vote: VoteMethod) -> IdentifyConfig {
    IdentifyConfig {
        window_radius: radius,
        vote_method: vote,
        model_languages: languages.iter().map(|l| l.to_string()).collect(),
        ..Default::default()
    }
}

/// Address nothing is listening on.
fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

fn unreachable_dictionary() -> DictionaryClient {
    DictionaryClient::new(closed_address(), Duration::from_millis(500))
}

#[test]
fn fragment_scores_reach_the_covered_token() {
    let fra = [("fra", 0.7), ("eng", 0.3)];
    let oracle = TableOracle::new(&["eng", "fra"])
        .with("hello bonjour world", &fra)
        .with("world hello bonjour", &fra)
        .with("bonjour world hello", &fra);
    let config = config(&["eng", "fra"], 1, VoteMethod::Dictionary);
    let dictionary = unreachable_dictionary();

    let analysis = identify("hello bonjour world", &config, &oracle, &dictionary).unwrap();
    assert_eq!(analysis.best_global.as_deref(), Some("fra"));

    let bonjour = &analysis.labels[1];
    assert_eq!(bonjour.surface, "bonjour");
    assert_eq!(bonjour.language, "fra");
    assert_eq!(bonjour.decision, Decision::Unambiguous);
    assert_eq!(bonjour.candidates.len(), 1);
    assert!((bonjour.candidates[0].1 - 0.7).abs() < 1e-9);
}

#[test]
fn unreachable_dictionary_falls_back_to_best_candidate() {
    let oracle = TableOracle::new(&["eng", "fra"]);
    let config = config(&["eng", "fra"], 1, VoteMethod::Dictionary);
    let dictionary = unreachable_dictionary();

    let analysis = identify("hello bonjour world", &config, &oracle, &dictionary).unwrap();
    assert_eq!(analysis.labels.len(), 3);
    for label in &analysis.labels {
        assert_eq!(label.decision, Decision::Fallback);
        assert_eq!(label.candidates.len(), 2);
        assert_eq!(label.language, label.candidates[0].0);
    }
}

#[test]
fn single_token_with_wide_window() {
    let oracle = TableOracle::new(&["eng", "fra"]).with(
        "bonjour bonjour bonjour bonjour bonjour",
        &[("fra", 0.9), ("eng", 0.1)],
    );
    let config = config(&["eng", "fra"], 2, VoteMethod::Oracle);

    let analysis = identify("bonjour", &config, &oracle, &unreachable_dictionary()).unwrap();
    assert_eq!(analysis.labels.len(), 1);
    assert_eq!(analysis.labels[0].language, "fra");
    // Five fragment slots all land on the one token.
    assert!((analysis.labels[0].candidates[0].1 - 0.9).abs() < 1e-9);
}

#[test]
fn every_token_gets_one_admissible_label_in_order() {
    let text = "the  cat, le chat\tdie Katze!";
    let oracle = TableOracle::new(&["deu", "eng", "fra"]);
    let mut config = config(&["deu", "eng", "fra"], 2, VoteMethod::Combined);
    config.languages = vec!["eng".into(), "fra".into()];

    let analysis = identify(text, &config, &oracle, &unreachable_dictionary()).unwrap();
    let surfaces: Vec<_> = analysis.labels.iter().map(|l| l.surface.as_str()).collect();
    assert_eq!(surfaces, ["the", "cat,", "le", "chat", "die", "Katze!"]);
    for (i, label) in analysis.labels.iter().enumerate() {
        assert_eq!(label.index, i);
        assert!(["eng", "fra"].contains(&label.language.as_str()));
    }
}

#[test]
fn oracle_labels_are_admissible_without_a_subset() {
    let scores = [("cos", 0.6), ("cor", 0.4)];
    let oracle = TableOracle::new(&["cos", "cor"])
        .with("bonghjornu a tutti", &scores)
        .with("tutti bonghjornu a", &scores)
        .with("a tutti bonghjornu", &scores);

    let analysis = identify(
        "bonghjornu a tutti",
        &IdentifyConfig::default(),
        &oracle,
        &unreachable_dictionary(),
    )
    .unwrap();
    assert_eq!(analysis.possible_languages, ["cos", "cor"]);
    assert_eq!(analysis.best_global.as_deref(), Some("cos"));
    for label in &analysis.labels {
        assert_eq!(label.language, "cos");
        assert_eq!(label.decision, Decision::Unambiguous);
    }
}

#[test]
fn empty_document_yields_no_labels() {
    let oracle = TableOracle::new(&["eng", "fra"]);
    let config = config(&["eng", "fra"], 1, VoteMethod::Dictionary);

    let analysis = identify("  \n\t ", &config, &oracle, &unreachable_dictionary()).unwrap();
    assert!(analysis.labels.is_empty());
    assert!(analysis.possible_languages.is_empty());
}

#[test]
fn no_possible_language_is_an_error() {
    let oracle = TableOracle::new(&["deu", "eng", "fra"])
        .with("guten tag", &[("deu", 0.95), ("eng", 0.03), ("fra", 0.02)]);
    let mut config = config(&["deu", "eng", "fra"], 1, VoteMethod::Dictionary);
    config.languages = vec!["eng".into(), "fra".into()];
    config.filter_threshold = 0.5;

    let err = identify("guten tag", &config, &oracle, &unreachable_dictionary()).unwrap_err();
    assert!(matches!(err, Error::NoPossibleLanguage { .. }));
}

#[test]
fn invalid_configuration_is_rejected() {
    let oracle = TableOracle::new(&["eng", "fra"]);
    let mut config = config(&["eng", "fra"], 1, VoteMethod::Dictionary);
    config.filter_threshold = 1.5;

    let err = identify("hello", &config, &oracle, &unreachable_dictionary()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn dictionary_server_settles_ambiguous_tokens() {
    let (tx, rx) = mpsc::channel();
    let server = thread::spawn(move || -> Result<(), ServerError> {
        let mut lexicon = Lexicon::new();
        lexicon.insert_words("eng", ["hello", "world"]);
        lexicon.insert_words("fra", ["bonjour", "monde"]);
        let server = DictionaryServer::bind("127.0.0.1:0", lexicon)?;
        tx.send(server.local_addr()?).ok();
        server.serve_n(3)
    });
    let addr = rx.recv().unwrap();

    let oracle = TableOracle::new(&["eng", "fra"]);
    let mut config = config(&["eng", "fra"], 1, VoteMethod::Dictionary);
    config.dictionary.address = addr.to_string();
    let dictionary = DictionaryClient::from_config(&config.dictionary);

    let analysis = identify("hello bonjour world", &config, &oracle, &dictionary).unwrap();
    let languages: Vec<_> = analysis.labels.iter().map(|l| l.language.as_str()).collect();
    assert_eq!(languages, ["eng", "fra", "eng"]);
    for label in &analysis.labels {
        assert_eq!(label.decision, Decision::Voted { score: 1.0 });
    }

    server.join().unwrap().unwrap();
}

#[test]
fn labels_written_to_file() {
    let oracle = TableOracle::new(&["eng", "fra"]).with("hello", &[("eng", 0.8), ("fra", 0.2)]);
    let config = config(&["eng", "fra"], 0, VoteMethod::Dictionary);
    let analysis = identify("hello", &config, &oracle, &unreachable_dictionary()).unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("default.out");
    write_labels(std::fs::File::create(&path).unwrap(), &analysis.labels, true).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, "hello\teng\teng (0.800)\n");
}
