//! Renderer-neutral layout of a comparison
//!
//! Walks a [`ComparisonResult`] into the two lines a correction view shows:
//! the learner's answer with moves, rewrites and missing-word carets, and the
//! reference with anchors where moved text belongs. Drawing is left to the
//! caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    ComparisonResult, GapKey, MissingAnchor, MoveBlockId, MovePlan, RewriteGroupId, TokenRole,
};

/// How a single user token should be shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TokenStatus {
    Ok,
    Misspelled { correction: String },
    Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaidOutToken {
    pub index: usize,
    pub raw: String,
    #[serde(flatten)]
    pub status: TokenStatus,
}

/// One element of the learner's line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UserSegment {
    /// A reference token the learner left out, shown as a caret
    #[serde(rename_all = "camelCase")]
    Missing {
        raw: String,
        orig_index: usize,
        gap: GapKey,
    },
    /// A span to replace wholesale with the corrected phrase
    #[serde(rename_all = "camelCase")]
    Rewrite {
        group: RewriteGroupId,
        original_text: String,
        correct_text: String,
        target_gap: GapKey,
    },
    /// Tokens that belong elsewhere, with a connector to `target_gap`
    #[serde(rename_all = "camelCase")]
    Move {
        block: MoveBlockId,
        tokens: Vec<LaidOutToken>,
        target_gap: GapKey,
    },
    Token(LaidOutToken),
}

/// One element of the reference line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReferenceSegment {
    /// Landing point for moves and rewrites aimed at this gap
    GapAnchor { gap: GapKey },
    Token { index: usize, raw: String },
}

fn laid_out(result: &ComparisonResult, index: usize) -> LaidOutToken {
    let raw = result.user_tokens[index].raw.clone();
    let meta = result.move_plan.token_meta.get(index);
    let status = match meta.and_then(|m| m.match_id.map(|id| (id, m.has_error))) {
        None => TokenStatus::Extra,
        Some((id, true)) => TokenStatus::Misspelled {
            correction: result
                .match_by_id(id)
                .map(|m| m.orig_token.raw.clone())
                .unwrap_or_default(),
        },
        Some((_, false)) => TokenStatus::Ok,
    };
    LaidOutToken { index, raw, status }
}

fn push_missing(plan: &MovePlan, position: usize, segments: &mut Vec<UserSegment>) {
    let anchors: &[MissingAnchor] = plan
        .missing_by_position
        .get(&position)
        .map(Vec::as_slice)
        .unwrap_or_default();
    segments.extend(anchors.iter().map(|anchor| UserSegment::Missing {
        raw: anchor.token.raw.clone(),
        orig_index: anchor.orig_index,
        gap: anchor.gap,
    }));
}

/// Lay out the learner's answer.
///
/// Missing tokens anchored inside a rewrite span are absorbed by its
/// corrected phrase. Those anchored inside a move block follow the block.
pub fn user_line(result: &ComparisonResult) -> Vec<UserSegment> {
    let plan = &result.move_plan;
    let len = result.user_tokens.len();
    let mut segments = Vec::new();
    let mut index = 0;

    while index < len {
        push_missing(plan, index, &mut segments);
        let role = plan.token_meta.get(index).map(|m| m.role);

        if let Some(TokenRole::RewriteMember(id)) = role
            && let Some(group) = plan.rewrite_group(id)
        {
            let end = group.end.min(len - 1).max(index);
            let original_text = result.user_tokens[index..=end]
                .iter()
                .map(|t| t.raw.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            segments.push(UserSegment::Rewrite {
                group: id,
                original_text,
                correct_text: group.correct_text.clone(),
                target_gap: group.target_gap,
            });
            index = end + 1;
            continue;
        }

        if let Some(TokenRole::MoveMember(id)) = role
            && let Some(block) = plan.move_block(id).filter(|b| !b.resolved_by_rewrite)
        {
            segments.push(UserSegment::Move {
                block: id,
                tokens: block.tokens.iter().map(|&i| laid_out(result, i)).collect(),
                target_gap: block.target_gap,
            });
            for inner in block.start + 1..=block.end {
                push_missing(plan, inner, &mut segments);
            }
            index = block.end + 1;
            continue;
        }

        segments.push(UserSegment::Token(laid_out(result, index)));
        index += 1;
    }

    push_missing(plan, len, &mut segments);
    segments
}

/// Lay out the reference with an anchor after the `before` token of every
/// gap that moved or rewritten text targets.
pub fn reference_line(result: &ComparisonResult) -> Vec<ReferenceSegment> {
    let mut by_before: BTreeMap<Option<usize>, Vec<GapKey>> = BTreeMap::new();
    for gap in &result.move_plan.gaps_needed {
        by_before.entry(gap.before).or_default().push(*gap);
    }

    let by_before = &by_before;
    let anchors = move |before: Option<usize>| {
        by_before
            .get(&before)
            .into_iter()
            .flatten()
            .map(|&gap| ReferenceSegment::GapAnchor { gap })
    };

    let mut segments: Vec<ReferenceSegment> = anchors(None).collect();
    for token in &result.original_tokens {
        segments.push(ReferenceSegment::Token {
            index: token.index,
            raw: token.raw.clone(),
        });
        segments.extend(anchors(Some(token.index)));
    }
    segments
}
