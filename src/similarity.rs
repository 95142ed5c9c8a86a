//! Pairwise token similarity
//!
//! Scores fall in [0, 1]. Exact and stem matches outrank typos, typos outrank
//! unrelated words, and a word never pairs well with punctuation.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use strsim::levenshtein;

use crate::config::CompareConfig;
use crate::types::Token;

/// Two punctuation marks with the same canonical form
const PUNCT_MATCH_SCORE: f64 = 0.8;

/// Two unrelated punctuation marks
const PUNCT_MISMATCH_SCORE: f64 = 0.2;

/// A word against a punctuation mark
const KIND_MISMATCH_SCORE: f64 = 0.05;

static EDGE_NON_LETTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\p{L}\p{M}]+|[^\p{L}\p{M}]+$").expect("edge pattern is valid")
});

/// Map typographic punctuation to its plain ASCII form
pub fn normalize_punctuation(raw: &str) -> Cow<'_, str> {
    match raw {
        "—" | "–" | "−" => Cow::Borrowed("-"),
        "…" => Cow::Borrowed("..."),
        "“" | "”" | "„" | "«" | "»" => Cow::Borrowed("\""),
        "‘" | "’" => Cow::Borrowed("'"),
        other => Cow::Borrowed(other),
    }
}

/// Strip the longest matching suffix after trimming non-letters at both ends.
///
/// `suffixes` must be ordered longest first.
pub fn stem(value: &str, suffixes: &[String]) -> String {
    let lowered = value.to_lowercase();
    let trimmed = EDGE_NON_LETTERS.replace_all(&lowered, "");
    suffixes
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix.as_str()))
        .unwrap_or(&*trimmed)
        .to_string()
}

/// `1 - levenshtein / max_len`, counted in characters
pub fn closeness(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count()).max(1);
    (1.0 - levenshtein(a, b) as f64 / max_len as f64).max(0.0)
}

/// Map edit-distance closeness onto the graded fuzzy band
fn fuzzy_score(closeness: f64) -> f64 {
    if closeness >= 0.8 {
        0.6 + closeness * 0.25
    } else if closeness >= 0.6 {
        0.5 + closeness * 0.2
    } else {
        closeness * 0.5
    }
}

/// Scores token pairs according to a [`CompareConfig`]
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    stem_score: f64,
    suffixes: Vec<String>,
    position_penalty: f64,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(&CompareConfig::default())
    }
}

impl SimilarityScorer {
    pub fn new(config: &CompareConfig) -> Self {
        let mut suffixes = config.stem_suffixes.clone();
        suffixes.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        suffixes.dedup();
        Self {
            stem_score: config.stem_score,
            suffixes,
            position_penalty: config.position_penalty,
        }
    }

    pub fn stem(&self, value: &str) -> String {
        stem(value, &self.suffixes)
    }

    /// Compatibility of two tokens, 0 when either is absent
    pub fn score(&self, a: Option<&Token>, b: Option<&Token>) -> f64 {
        let (Some(a), Some(b)) = (a, b) else {
            return 0.0;
        };

        if a.is_punct() && b.is_punct() {
            return if normalize_punctuation(&a.raw) == normalize_punctuation(&b.raw) {
                PUNCT_MATCH_SCORE
            } else {
                PUNCT_MISMATCH_SCORE
            };
        }
        if a.kind != b.kind {
            return KIND_MISMATCH_SCORE;
        }
        if a.norm == b.norm {
            return 1.0;
        }

        let stem_a = self.stem(&a.norm);
        if !stem_a.is_empty() && stem_a == self.stem(&b.norm) {
            return self.stem_score;
        }

        fuzzy_score(closeness(&a.norm, &b.norm))
    }

    /// Score every (user, reference) pair; rows are user tokens
    pub fn matrix(&self, user: &[Token], reference: &[Token]) -> Vec<Vec<f64>> {
        let span = user.len().max(reference.len()).max(1) as f64;
        user.iter()
            .enumerate()
            .map(|(i, u)| {
                reference
                    .iter()
                    .enumerate()
                    .map(|(j, r)| {
                        let base = self.score(Some(u), Some(r));
                        if self.position_penalty > 0.0 {
                            let drift = i.abs_diff(j) as f64 / span;
                            (base - self.position_penalty * drift).max(0.0)
                        } else {
                            base
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
