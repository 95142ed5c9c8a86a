//! Comparison entry point and verdict
//!
//! Runs the full pipeline: tokenize, score, assign, extract the backbone,
//! plan moves and rewrites, anchor missing tokens, then count errors.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::assignment::max_weight_assignment;
use crate::config::CompareConfig;
use crate::error::{Error, Result};
use crate::missing::missing_by_position;
use crate::order::longest_increasing_subsequence;
use crate::planner::build_move_plan;
use crate::similarity::SimilarityScorer;
use crate::tokenizer::tokenize;
use crate::types::{
    ComparisonResult, ErrorBreakdown, ExtraToken, Match, MatchId, MissingToken, MovePlan, Token,
};

/// Compares dictation answers against reference text
#[derive(Debug, Clone)]
pub struct Comparator {
    config: CompareConfig,
    scorer: SimilarityScorer,
}

impl Default for Comparator {
    fn default() -> Self {
        let config = CompareConfig::default();
        let scorer = SimilarityScorer::new(&config);
        Self { config, scorer }
    }
}

impl Comparator {
    /// Create a comparator, rejecting an invalid configuration
    pub fn new(config: CompareConfig) -> Result<Self> {
        config.validate()?;
        let scorer = SimilarityScorer::new(&config);
        Ok(Self { config, scorer })
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Grade `user_input` against `reference_text`.
    ///
    /// Fails only with [`Error::InputTooLarge`]; every kind of mistake is
    /// reported inside the result.
    pub fn compare(&self, user_input: &str, reference_text: &str) -> Result<ComparisonResult> {
        let user_norm = user_input.trim();
        let reference_norm = reference_text.trim();
        let user_tokens = tokenize(user_norm);
        let original_tokens = tokenize(reference_norm);

        if user_norm == reference_norm {
            debug!("Answer is identical to reference ({} tokens)", user_tokens.len());
            return Ok(exact_result(user_tokens, original_tokens));
        }

        self.check_size(&user_tokens, &original_tokens)?;

        let matches = self.match_tokens(&user_tokens, &original_tokens);
        let backbone = extract_backbone(&matches);
        debug!(
            "Matched {} of {} user tokens against {} reference tokens, backbone {}",
            matches.len(),
            user_tokens.len(),
            original_tokens.len(),
            backbone.len()
        );

        let extras = unmatched_user(&user_tokens, &matches);
        let missing = unmatched_reference(&original_tokens, &matches);

        let mut move_plan = build_move_plan(&matches, &backbone, &user_tokens, &original_tokens);
        move_plan.missing_by_position = missing_by_position(&missing, &matches);

        let breakdown = ErrorBreakdown {
            extras: extras.len(),
            missing: missing.len(),
            spelling: matches
                .iter()
                .filter(|m| m.user_token.raw != m.orig_token.raw)
                .count(),
            order: matches.iter().filter(|m| !backbone.contains(&m.id)).count(),
            moves: move_plan.rewrite_groups.len() + move_plan.unresolved_blocks().count(),
        };
        let error_count = breakdown.total();
        debug!("Comparison finished with {} errors: {:?}", error_count, breakdown);

        Ok(ComparisonResult {
            is_correct: error_count == 0,
            user_tokens,
            original_tokens,
            matches,
            backbone,
            extras,
            missing,
            move_plan,
            error_count,
            breakdown,
        })
    }

    /// Same as [`Comparator::compare`], serialized to JSON
    pub fn compare_json(&self, user_input: &str, reference_text: &str) -> Result<String> {
        self.compare(user_input, reference_text)?.to_json()
    }

    fn check_size(&self, user: &[Token], reference: &[Token]) -> Result<()> {
        let tokens = user.len().max(reference.len());
        if tokens > self.config.max_tokens {
            warn!(
                "Rejecting comparison: {} tokens exceeds limit of {}",
                tokens, self.config.max_tokens
            );
            return Err(Error::InputTooLarge {
                tokens,
                limit: self.config.max_tokens,
            });
        }
        Ok(())
    }

    /// Optimal assignment, keeping only pairs above the acceptance threshold
    fn match_tokens(&self, user: &[Token], reference: &[Token]) -> Vec<Match> {
        let similarity = self.scorer.matrix(user, reference);
        max_weight_assignment(&similarity)
            .into_iter()
            .filter(|a| a.weight >= self.config.min_acceptable_score)
            .enumerate()
            .map(|(id, a)| Match {
                id,
                user_index: a.row,
                orig_index: a.col,
                user_token: user[a.row].clone(),
                orig_token: reference[a.col].clone(),
                score: a.weight,
                exact: user[a.row].raw == reference[a.col].raw,
            })
            .collect()
    }
}

/// Compare with the default configuration
///
/// # Examples
/// ```
/// let result = dictation::compare("I see a car red", "I see a red car").unwrap();
/// assert!(!result.is_correct);
/// assert_eq!(result.move_plan.move_blocks.len(), 1);
/// ```
pub fn compare(user_input: &str, reference_text: &str) -> Result<ComparisonResult> {
    Comparator::default().compare(user_input, reference_text)
}

/// Compare with the default configuration and return the result as JSON
pub fn compare_json(user_input: &str, reference_text: &str) -> Result<String> {
    Comparator::default().compare_json(user_input, reference_text)
}

/// Match ids forming the longest run already in reference order.
///
/// `matches` must be sorted by user index.
fn extract_backbone(matches: &[Match]) -> BTreeSet<MatchId> {
    let origs: Vec<usize> = matches.iter().map(|m| m.orig_index).collect();
    longest_increasing_subsequence(&origs)
        .into_iter()
        .map(|i| matches[i].id)
        .collect()
}

fn unmatched_user(tokens: &[Token], matches: &[Match]) -> Vec<ExtraToken> {
    let matched: BTreeSet<usize> = matches.iter().map(|m| m.user_index).collect();
    tokens
        .iter()
        .filter(|t| !matched.contains(&t.index))
        .map(|t| ExtraToken {
            user_index: t.index,
            token: t.clone(),
        })
        .collect()
}

fn unmatched_reference(tokens: &[Token], matches: &[Match]) -> Vec<MissingToken> {
    let matched: BTreeSet<usize> = matches.iter().map(|m| m.orig_index).collect();
    tokens
        .iter()
        .filter(|t| !matched.contains(&t.index))
        .map(|t| MissingToken {
            orig_index: t.index,
            token: t.clone(),
        })
        .collect()
}

/// Result for an answer identical to the reference: every token pairs with
/// itself and sits on the backbone.
fn exact_result(user_tokens: Vec<Token>, original_tokens: Vec<Token>) -> ComparisonResult {
    let matches: Vec<Match> = user_tokens
        .iter()
        .zip(&original_tokens)
        .enumerate()
        .map(|(id, (u, o))| Match {
            id,
            user_index: u.index,
            orig_index: o.index,
            user_token: u.clone(),
            orig_token: o.clone(),
            score: 1.0,
            exact: true,
        })
        .collect();
    let backbone: BTreeSet<MatchId> = matches.iter().map(|m| m.id).collect();
    let move_plan = if matches.is_empty() {
        MovePlan::default()
    } else {
        build_move_plan(&matches, &backbone, &user_tokens, &original_tokens)
    };

    ComparisonResult {
        is_correct: true,
        user_tokens,
        original_tokens,
        matches,
        backbone,
        extras: Vec::new(),
        missing: Vec::new(),
        move_plan,
        error_count: 0,
        breakdown: ErrorBreakdown::default(),
    }
}
