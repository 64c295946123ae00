//! Spoken phrase to expression rewriting.
//!
//! A transcript is lower-cased, then every rule's phrase is replaced by its
//! symbol, in table order, as a plain substring replacement. Order matters:
//! a short phrase such as `by` would otherwise eat the tail of `divided by`.
//! This is a heuristic rewrite, not a grammar. `to` becomes `2` and `for`
//! becomes `4` even inside longer words.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Replace every occurrence of `phrase` with `symbol`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseRule {
    pub phrase: String,
    pub symbol: String,
}

impl PhraseRule {
    pub fn new(phrase: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            symbol: symbol.into(),
        }
    }
}

/// Built-in rules in application order.
const BUILTIN_RULES: &[(&str, &str)] = &[
    // Mis-transcribed times: "3:22" means 322.
    (":", ""),
    // Multiplication
    ("multiplied by", "×"),
    ("multiplied", "×"),
    ("multiply", "×"),
    ("into", "×"),
    ("times", "×"),
    ("tines", "×"),
    ("product of", "×"),
    // Division
    ("divided by", "÷"),
    ("divide by", "÷"),
    ("divide", "÷"),
    ("over", "÷"),
    ("hour", "÷"),
    ("all", "÷"),
    ("per", "÷"),
    // Addition
    ("plus", "+"),
    ("add", "+"),
    ("sum", "+"),
    ("and", "+"),
    ("increased by", "+"),
    ("total of", "+"),
    ("bless", "+"),
    // Subtraction
    ("minus", "-"),
    ("mines", "-"),
    ("subtract", "-"),
    ("take away", "-"),
    ("less", "-"),
    ("decreased by", "-"),
    ("difference of", "-"),
    // Short division spellings go after every phrase ending in "by".
    ("by", "÷"),
    ("/", "÷"),
    // Digits
    ("one", "1"),
    ("two", "2"),
    ("to", "2"),
    ("three", "3"),
    ("four", "4"),
    ("for", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("zero", "0"),
    // Bare "x" goes after "six".
    ("x", "×"),
    ("*", "×"),
];

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref BUILTIN: PhraseTable = PhraseTable::builtin();
}

/// An ordered set of substitution rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhraseTable {
    rules: Vec<PhraseRule>,
}

impl Default for PhraseTable {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl PhraseTable {
    /// Build a table from rules, applied in the given order.
    ///
    /// Phrases are lower-cased to match the lower-cased transcript. Rules
    /// with an empty phrase are dropped.
    pub fn new(rules: impl IntoIterator<Item = PhraseRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter_map(|rule| {
                if rule.phrase.is_empty() {
                    warn!(symbol = %rule.symbol, "ignoring phrase rule with empty phrase");
                    return None;
                }
                Some(PhraseRule {
                    phrase: rule.phrase.to_lowercase(),
                    symbol: rule.symbol,
                })
            })
            .collect();

        Self { rules }
    }

    /// The default English table.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_RULES
                .iter()
                .map(|&(phrase, symbol)| PhraseRule::new(phrase, symbol)),
        )
    }

    /// Return a table that applies `extra` before the current rules.
    pub fn with_extra(self, extra: impl IntoIterator<Item = PhraseRule>) -> Self {
        Self::new(extra.into_iter().chain(self.rules))
    }

    pub fn rules(&self) -> &[PhraseRule] {
        &self.rules
    }

    /// Rewrite a transcript into an expression string.
    pub fn normalize(&self, transcript: &str) -> String {
        let mut processed = transcript.to_lowercase();

        for rule in &self.rules {
            if processed.contains(rule.phrase.as_str()) {
                processed = processed.replace(rule.phrase.as_str(), &rule.symbol);
            }
        }

        let expression = WHITESPACE.replace_all(&processed, "").into_owned();
        debug!(transcript, %expression, "normalized transcript");
        expression
    }
}

/// Rewrite a transcript with the built-in table.
pub fn normalize(transcript: &str) -> String {
    BUILTIN.normalize(transcript)
}
