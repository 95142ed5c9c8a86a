//! Tunable policy for the comparison engine
//!
//! The defaults are tuned for Norwegian dictation exercises. The suffix list
//! in particular should be replaced per target language.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Assignments scoring below this are discarded as low confidence
pub const MIN_ACCEPTABLE_SCORE: f64 = 0.35;

/// Score given to two words that share a stem
pub const STEM_SIMILARITY_SCORE: f64 = 0.85;

/// Upper bound on tokens per side before the O(n^3) solver is refused
pub const DEFAULT_MAX_TOKENS: usize = 200;

/// Inflectional endings stripped by the minimal stemmer
pub const DEFAULT_STEM_SUFFIXES: &[&str] = &["ene", "ane", "het", "ers", "er", "en", "et", "e"];

/// Configuration for a [`Comparator`](crate::Comparator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompareConfig {
    /// Minimum similarity for an assignment to count as a match
    pub min_acceptable_score: f64,
    /// Similarity for words with equal stems
    pub stem_score: f64,
    /// Suffixes the stemmer may strip (longest match wins)
    pub stem_suffixes: Vec<String>,
    /// Penalty per unit of normalized positional distance, 0 disables it
    pub position_penalty: f64,
    /// Maximum token count accepted on either side
    pub max_tokens: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            min_acceptable_score: MIN_ACCEPTABLE_SCORE,
            stem_score: STEM_SIMILARITY_SCORE,
            stem_suffixes: DEFAULT_STEM_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            position_penalty: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl CompareConfig {
    pub fn with_min_acceptable_score(mut self, score: f64) -> Self {
        self.min_acceptable_score = score;
        self
    }

    pub fn with_stem_score(mut self, score: f64) -> Self {
        self.stem_score = score;
        self
    }

    pub fn with_stem_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stem_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_position_penalty(mut self, penalty: f64) -> Self {
        self.position_penalty = penalty;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Parse a configuration from JSON, filling unspecified fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        check_unit("min_acceptable_score", self.min_acceptable_score)?;
        check_unit("stem_score", self.stem_score)?;
        if !self.position_penalty.is_finite() || self.position_penalty < 0.0 {
            return Err(Error::Config(format!(
                "position_penalty must be a non-negative number, got {}",
                self.position_penalty
            )));
        }
        if self.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be at least 1".to_string()));
        }
        if self.stem_suffixes.iter().any(|s| s.is_empty()) {
            return Err(Error::Config("stem suffixes must not be empty".to_string()));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{name} must be within [0, 1], got {value}")))
    }
}
