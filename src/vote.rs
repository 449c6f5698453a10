//! Disambiguation when several languages survive thresholding.
//!
//! The strategies look at the original token in isolation: the oracle on the
//! bare token, the dictionary on its longest alphabetic piece, or both. None
//! of them fails; an inconclusive strategy returns [`Vote::none`] and the
//! caller falls back to the best thresholded probability.

use tracing::{debug, warn};

use crate::config::VoteMethod;
use crate::dictionary::Dictionary;
use crate::oracle::LanguageOracle;
use crate::tokenize::Cleaner;

/// Outcome of a vote. `score` is 0 when no language was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub language: Option<String>,
    pub score: f64,
}

impl Vote {
    pub fn none() -> Self {
        Self {
            language: None,
            score: 0.0,
        }
    }

    pub fn for_language(language: impl Into<String>, score: f64) -> Self {
        Self {
            language: Some(language.into()),
            score,
        }
    }

    /// The winning language, if the vote reached a decision.
    pub fn winner(&self) -> Option<&str> {
        self.language.as_deref().filter(|_| self.score > 0.0)
    }
}

/// Merge the oracle and dictionary votes into a tally over `viable`.
///
/// Each vote adds one point to its language. When the two disagree,
/// `best_global` gets a deciding point if it is one of them; otherwise
/// neither is trusted and no language is chosen.
pub fn combine_votes(
    oracle_vote: Option<&str>,
    dictionary_vote: Option<&str>,
    viable: &[String],
    best_global: Option<&str>,
) -> Vote {
    let mut tally: Vec<(&str, u32)> = viable.iter().map(|lang| (lang.as_str(), 0)).collect();
    let mut cast = Vec::with_capacity(2);
    for lang in [oracle_vote, dictionary_vote].into_iter().flatten() {
        if let Some(entry) = tally.iter_mut().find(|(code, _)| *code == lang) {
            entry.1 += 1;
            cast.push(lang);
        }
    }

    if let [first, second] = cast.as_slice() {
        if first != second {
            match best_global.filter(|global| global == first || global == second) {
                Some(global) => {
                    if let Some(entry) = tally.iter_mut().find(|(code, _)| *code == global) {
                        entry.1 += 1;
                    }
                }
                None => {
                    debug!(first, second, ?best_global, "contradicting votes, no decision");
                    return Vote::none();
                }
            }
        }
    }

    let mut winner: Option<(&str, u32)> = None;
    for &(lang, count) in &tally {
        if count > winner.map_or(0, |(_, top)| top) {
            winner = Some((lang, count));
        }
    }
    match winner {
        Some((lang, count)) => Vote::for_language(lang, f64::from(count)),
        None => Vote::none(),
    }
}

/// Runs the configured voting strategy on ambiguous tokens.
pub struct Voter<'a, O: ?Sized, D: ?Sized> {
    oracle: &'a O,
    dictionary: &'a D,
    cleaner: &'a Cleaner,
    best_global: Option<&'a str>,
}

impl<'a, O, D> Voter<'a, O, D>
where
    O: LanguageOracle + ?Sized,
    D: Dictionary + ?Sized,
{
    pub fn new(
        oracle: &'a O,
        dictionary: &'a D,
        cleaner: &'a Cleaner,
        best_global: Option<&'a str>,
    ) -> Self {
        Self {
            oracle,
            dictionary,
            cleaner,
            best_global,
        }
    }

    pub fn vote(&self, method: VoteMethod, token: &str, viable: &[String]) -> Vote {
        match method {
            VoteMethod::Oracle => self.oracle_vote(token, viable),
            VoteMethod::Dictionary => self.dictionary_vote(token, viable),
            VoteMethod::Combined => self.combined_vote(token, viable),
        }
    }

    /// Viable language the oracle scores highest on the token alone.
    pub fn oracle_vote(&self, token: &str, viable: &[String]) -> Vote {
        let scores = self.oracle.classify(token);
        let mut best: Option<(&str, f64)> = None;
        for (lang, prob) in scores.iter() {
            if viable.iter().any(|code| code == lang) && prob > best.map_or(0.0, |(_, top)| top) {
                best = Some((lang, prob));
            }
        }
        debug!(token, ?best, "oracle vote");
        match best {
            Some((lang, prob)) => Vote::for_language(lang, prob),
            None => Vote::none(),
        }
    }

    /// The single viable language whose dictionary knows the token.
    pub fn dictionary_vote(&self, token: &str, viable: &[String]) -> Vote {
        match self.dictionary_match(token, viable) {
            Some(lang) => Vote::for_language(lang, 1.0),
            None => Vote::none(),
        }
    }

    /// Oracle and dictionary votes, tie broken by the global best language.
    pub fn combined_vote(&self, token: &str, viable: &[String]) -> Vote {
        let oracle = self.oracle_vote(token, viable);
        let dictionary = self.dictionary_match(token, viable);
        let vote = combine_votes(
            oracle.winner(),
            dictionary.as_deref(),
            viable,
            self.best_global,
        );
        debug!(token, ?vote, "combined vote");
        vote
    }

    fn dictionary_match(&self, token: &str, viable: &[String]) -> Option<String> {
        let word = self.cleaner.longest_subtoken(token);
        if word.is_empty() {
            debug!(token, "no alphabetic content, skipping dictionary");
            return None;
        }

        let known = match self.dictionary.lookup(&word, viable) {
            Ok(known) => known,
            Err(err) => {
                warn!(word = %word, error = %err, "dictionary lookup failed, treating as no match");
                return None;
            }
        };

        let mut matches = known
            .into_iter()
            .filter(|lang| viable.iter().any(|code| code == lang));
        match (matches.next(), matches.next()) {
            (Some(lang), None) => Some(lang),
            (first, second) => {
                debug!(word = %word, ?first, ?second, "dictionary vote inconclusive");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::*;
    use crate::dictionary::{DictionaryClient, Lexicon};
    use crate::error::DictionaryError;
    use crate::oracle::Distribution;

    #[derive(Default)]
    struct TableOracle {
        table: HashMap<&'static str, Distribution>,
    }

    impl TableOracle {
        fn with(mut self, text: &'static str, scores: &[(&str, f64)]) -> Self {
            self.table
                .insert(text, Distribution::from_pairs(scores.iter().copied()));
            self
        }
    }

    impl LanguageOracle for TableOracle {
        fn labels(&self) -> Vec<String> {
            vec!["eng".into(), "fra".into(), "ita".into()]
        }

        fn classify(&self, text: &str) -> Distribution {
            self.table.get(text).cloned().unwrap_or_default()
        }
    }

    struct FailingDictionary;

    impl Dictionary for FailingDictionary {
        fn lookup(&self, _: &str, _: &[String]) -> Result<BTreeSet<String>, DictionaryError> {
            Err(DictionaryError::EmptyResponse)
        }
    }

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|code| code.to_string()).collect()
    }

    fn lexicon() -> Lexicon {
        let mut lexicon = Lexicon::new();
        lexicon.insert_words("eng", ["table", "hello"]);
        lexicon.insert_words("fra", ["table", "bonjour", "école"]);
        lexicon
    }

    #[test]
    fn tie_break_goes_to_global_best() {
        let viable = langs(&["eng", "fra"]);
        let vote = combine_votes(Some("eng"), Some("fra"), &viable, Some("eng"));
        assert_eq!(vote, Vote::for_language("eng", 2.0));
    }

    #[test]
    fn tie_without_global_support_is_undecided() {
        let viable = langs(&["eng", "fra", "ita"]);
        let vote = combine_votes(Some("eng"), Some("fra"), &viable, Some("ita"));
        assert_eq!(vote, Vote::none());
        assert_eq!(combine_votes(Some("eng"), Some("fra"), &viable, None), Vote::none());
    }

    #[test]
    fn agreeing_votes_add_up() {
        let viable = langs(&["eng", "fra"]);
        assert_eq!(
            combine_votes(Some("fra"), Some("fra"), &viable, Some("eng")),
            Vote::for_language("fra", 2.0)
        );
        assert_eq!(
            combine_votes(None, Some("fra"), &viable, Some("eng")),
            Vote::for_language("fra", 1.0)
        );
        assert_eq!(combine_votes(None, None, &viable, Some("eng")), Vote::none());
    }

    #[test]
    fn votes_outside_the_viable_set_are_ignored() {
        let viable = langs(&["eng", "fra"]);
        assert_eq!(
            combine_votes(Some("ita"), Some("fra"), &viable, Some("ita")),
            Vote::for_language("fra", 1.0)
        );
    }

    #[test]
    fn oracle_vote_picks_best_viable_language() {
        let oracle = TableOracle::default().with("ciao!", &[("ita", 0.7), ("fra", 0.2), ("eng", 0.1)]);
        let lexicon = lexicon();
        let cleaner = Cleaner::default();
        let voter = Voter::new(&oracle, &lexicon, &cleaner, None);

        let vote = voter.oracle_vote("ciao!", &langs(&["eng", "fra"]));
        assert_eq!(vote, Vote::for_language("fra", 0.2));
        assert_eq!(voter.oracle_vote("unknown", &langs(&["eng", "fra"])), Vote::none());
    }

    #[test]
    fn dictionary_vote_needs_a_unique_match() {
        let oracle = TableOracle::default();
        let lexicon = lexicon();
        let cleaner = Cleaner::default();
        let voter = Voter::new(&oracle, &lexicon, &cleaner, None);
        let viable = langs(&["eng", "fra"]);

        assert_eq!(voter.dictionary_vote("«bonjour»,", &viable), Vote::for_language("fra", 1.0));
        assert_eq!(voter.dictionary_vote("l'école", &viable), Vote::for_language("fra", 1.0));
        assert_eq!(voter.dictionary_vote("table", &viable), Vote::none());
        assert_eq!(voter.dictionary_vote("xyzzy", &viable), Vote::none());
        assert_eq!(voter.dictionary_vote("--", &viable), Vote::none());
        assert_eq!(voter.dictionary_vote("table", &langs(&["eng", "ita"])), Vote::for_language("eng", 1.0));
    }

    #[test]
    fn dictionary_failure_is_no_decision() {
        let oracle = TableOracle::default();
        let cleaner = Cleaner::default();
        let voter = Voter::new(&oracle, &FailingDictionary, &cleaner, None);
        assert_eq!(voter.dictionary_vote("bonjour", &langs(&["eng", "fra"])), Vote::none());
    }

    #[test]
    fn unreachable_dictionary_service_is_no_decision() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = DictionaryClient::new(addr.to_string(), std::time::Duration::from_millis(300));
        let oracle = TableOracle::default();
        let cleaner = Cleaner::default();
        let voter = Voter::new(&oracle, &client, &cleaner, None);
        let vote = voter.vote(VoteMethod::Dictionary, "bonjour", &langs(&["eng", "fra"]));
        assert_eq!(vote, Vote::none());
        assert_eq!(vote.winner(), None);
    }

    #[test]
    fn combined_vote_uses_global_best_on_disagreement() {
        // The oracle leans English on "table", the dictionary only knows it in French here.
        let oracle = TableOracle::default().with("Table", &[("eng", 0.6), ("fra", 0.4)]);
        let mut lexicon = Lexicon::new();
        lexicon.insert_words("fra", ["table"]);
        let cleaner = Cleaner::default();
        let viable = langs(&["eng", "fra"]);

        let voter = Voter::new(&oracle, &lexicon, &cleaner, Some("fra"));
        assert_eq!(voter.vote(VoteMethod::Combined, "Table", &viable), Vote::for_language("fra", 2.0));

        let voter = Voter::new(&oracle, &lexicon, &cleaner, Some("ita"));
        assert_eq!(voter.vote(VoteMethod::Combined, "Table", &viable), Vote::none());
    }

    #[test]
    fn combined_vote_with_single_signal() {
        let oracle = TableOracle::default();
        let lexicon = lexicon();
        let cleaner = Cleaner::default();
        let voter = Voter::new(&oracle, &lexicon, &cleaner, Some("eng"));
        assert_eq!(
            voter.vote(VoteMethod::Combined, "bonjour", &langs(&["eng", "fra"])),
            Vote::for_language("fra", 1.0)
        );
    }
}
