//! Move and rewrite planning
//!
//! Matches outside the backbone are grouped into move blocks aimed at a gap
//! between backbone tokens. When several blocks compete for the same gap
//! they are merged into one rewrite, which reads better than a tangle of
//! crossing move arrows.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::types::{
    GapKey, GapMeta, Match, MatchId, MoveBlock, MoveBlockId, MovePlan, RewriteGroup, Token,
    TokenMeta, TokenRole,
};

/// Backbone reference positions and where they sit in the user's answer
struct BackboneAnchors {
    /// Sorted reference indices of backbone matches
    orig_sorted: Vec<usize>,
    /// Reference index to user index, backbone only
    user_by_orig: BTreeMap<usize, usize>,
}

impl BackboneAnchors {
    fn new(ordered: &[&Match], backbone: &BTreeSet<MatchId>) -> Self {
        let user_by_orig: BTreeMap<usize, usize> = ordered
            .iter()
            .filter(|m| backbone.contains(&m.id))
            .map(|m| (m.orig_index, m.user_index))
            .collect();
        Self {
            orig_sorted: user_by_orig.keys().copied().collect(),
            user_by_orig,
        }
    }

    /// Nearest backbone reference indices strictly below and above `orig`
    fn gap_for(&self, orig: usize) -> GapKey {
        let below = self.orig_sorted.partition_point(|&x| x < orig);
        let above = self.orig_sorted.partition_point(|&x| x <= orig);
        GapKey::new(
            below.checked_sub(1).map(|i| self.orig_sorted[i]),
            self.orig_sorted.get(above).copied(),
        )
    }

    fn user_of(&self, orig: Option<usize>) -> Option<usize> {
        orig.and_then(|o| self.user_by_orig.get(&o).copied())
    }

    fn meta(&self, key: GapKey) -> GapMeta {
        GapMeta {
            key,
            before_user: self.user_of(key.before),
            after_user: self.user_of(key.after),
        }
    }
}

/// A block still accepting members
struct OpenBlock {
    block: MoveBlock,
    last_orig: usize,
}

impl OpenBlock {
    fn start(id: MoveBlockId, m: &Match, gap: GapKey, has_error: bool) -> Self {
        Self {
            block: MoveBlock {
                id,
                tokens: vec![m.user_index],
                start: m.user_index,
                end: m.user_index,
                target_gap: gap,
                has_error,
                resolved_by_rewrite: false,
            },
            last_orig: m.orig_index,
        }
    }

    /// Same destination, directly adjacent, and keeps internal order
    fn accepts(&self, m: &Match, gap: GapKey) -> bool {
        self.block.target_gap == gap
            && m.user_index == self.block.end + 1
            && m.orig_index > self.last_orig
    }

    fn extend(&mut self, m: &Match, has_error: bool) {
        self.block.tokens.push(m.user_index);
        self.block.end = m.user_index;
        self.block.has_error |= has_error;
        self.last_orig = m.orig_index;
    }
}

/// Single forward scan over matches in user order
enum BlockState {
    NoOpenBlock,
    OpenBlock(OpenBlock),
}

impl BlockState {
    fn step(
        self,
        m: &Match,
        gap: GapKey,
        in_backbone: bool,
        has_error: bool,
        closed: &mut Vec<MoveBlock>,
    ) -> Self {
        match (self, in_backbone) {
            (BlockState::NoOpenBlock, true) => BlockState::NoOpenBlock,
            (BlockState::OpenBlock(open), true) => {
                closed.push(open.block);
                BlockState::NoOpenBlock
            }
            (BlockState::OpenBlock(mut open), false) if open.accepts(m, gap) => {
                open.extend(m, has_error);
                BlockState::OpenBlock(open)
            }
            (state, false) => {
                state.finish(closed);
                BlockState::OpenBlock(OpenBlock::start(closed.len(), m, gap, has_error))
            }
        }
    }

    fn finish(self, closed: &mut Vec<MoveBlock>) {
        if let BlockState::OpenBlock(open) = self {
            closed.push(open.block);
        }
    }

    fn open_id(&self) -> Option<MoveBlockId> {
        match self {
            BlockState::OpenBlock(open) => Some(open.block.id),
            BlockState::NoOpenBlock => None,
        }
    }
}

/// Build move blocks, rewrite groups and per-token metadata.
///
/// `missing_by_position` is left empty; see [`crate::missing`].
pub fn build_move_plan(
    matches: &[Match],
    backbone: &BTreeSet<MatchId>,
    user_tokens: &[Token],
    original_tokens: &[Token],
) -> MovePlan {
    let mut ordered: Vec<&Match> = matches.iter().collect();
    ordered.sort_by_key(|m| m.user_index);

    let anchors = BackboneAnchors::new(&ordered, backbone);
    let mut token_meta = vec![TokenMeta::extra(); user_tokens.len()];
    let mut gap_meta = BTreeMap::new();
    let mut move_blocks = Vec::new();
    let mut state = BlockState::NoOpenBlock;

    for m in &ordered {
        let gap = anchors.gap_for(m.orig_index);
        gap_meta.entry(gap).or_insert_with(|| anchors.meta(gap));

        let in_backbone = backbone.contains(&m.id);
        let has_error = m.user_token.raw != m.orig_token.raw;
        state = state.step(m, gap, in_backbone, has_error, &mut move_blocks);

        let role = match state.open_id() {
            Some(block) if !in_backbone => TokenRole::MoveMember(block),
            _ => TokenRole::Backbone(m.id),
        };
        if let Some(meta) = token_meta.get_mut(m.user_index) {
            *meta = TokenMeta {
                role,
                match_id: Some(m.id),
                target_gap: Some(gap),
                has_error,
            };
        }
    }
    state.finish(&mut move_blocks);

    let rewrite_groups = merge_rewrites(
        &mut move_blocks,
        &mut token_meta,
        &ordered,
        &anchors,
        user_tokens,
        original_tokens,
    );

    let gaps_needed: BTreeSet<GapKey> = move_blocks
        .iter()
        .map(|b| b.target_gap)
        .chain(rewrite_groups.iter().map(|g| g.target_gap))
        .collect();

    debug!(
        "Move plan: {} blocks, {} rewrites, {} gaps needed",
        move_blocks.len(),
        rewrite_groups.len(),
        gaps_needed.len()
    );

    MovePlan {
        move_blocks,
        rewrite_groups,
        token_meta,
        gap_meta,
        gaps_needed,
        missing_by_position: BTreeMap::new(),
    }
}

/// Merge blocks that share a gap key into rewrite groups
fn merge_rewrites(
    blocks: &mut [MoveBlock],
    token_meta: &mut [TokenMeta],
    ordered: &[&Match],
    anchors: &BackboneAnchors,
    user_tokens: &[Token],
    original_tokens: &[Token],
) -> Vec<RewriteGroup> {
    // gap key -> block positions, in order of first appearance
    let mut by_gap: Vec<(GapKey, Vec<usize>)> = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        match by_gap.iter_mut().find(|(key, _)| *key == block.target_gap) {
            Some((_, members)) => members.push(i),
            None => by_gap.push((block.target_gap, vec![i])),
        }
    }

    let Some(last_user) = user_tokens.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut groups = Vec::new();
    for (gap, members) in by_gap.into_iter().filter(|(_, m)| m.len() >= 2) {
        let floor = anchors.user_of(gap.before).map_or(0, |u| u + 1);
        let ceiling = anchors.user_of(gap.after).unwrap_or(user_tokens.len());

        let min_start = members.iter().map(|&i| blocks[i].start).min().unwrap_or(floor);
        let max_end = members.iter().map(|&i| blocks[i].end).max().unwrap_or(floor);

        let start = min_start.min(floor);
        let mut end = max_end.max(ceiling).min(last_user);
        // only trim punctuation the span picked up from the bounding backbone,
        // never a token of a merged block
        if end == last_user && end > max_end && user_tokens[end].is_punct() {
            end -= 1;
        }

        let fallback = match gap.after {
            Some(after) => after.checked_sub(1),
            None => original_tokens.len().checked_sub(1),
        };
        let max_orig = ordered
            .iter()
            .filter(|m| (start..=end).contains(&m.user_index))
            .map(|m| m.orig_index)
            .max()
            .max(fallback);

        let correct_text = match max_orig {
            Some(max_orig) => original_tokens
                .iter()
                .filter(|t| t.index >= gap.first_slot() && t.index <= max_orig)
                .map(|t| t.raw.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            None => String::new(),
        };

        let id = groups.len();
        for &i in &members {
            blocks[i].resolved_by_rewrite = true;
        }
        for meta in token_meta.iter_mut().take(end + 1).skip(start) {
            meta.role = TokenRole::RewriteMember(id);
            meta.target_gap = Some(gap);
        }

        debug!(
            "Rewrite {} merges {} blocks over user tokens {}..={} into {:?}",
            id,
            members.len(),
            start,
            end,
            correct_text
        );

        groups.push(RewriteGroup {
            id,
            start,
            end,
            target_gap: gap,
            correct_text,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::longest_increasing_subsequence;
    use crate::tokenizer::tokenize;

    /// Build a plan from explicit (user, reference) index pairs
    fn plan_for(user: &str, reference: &str, pairs: &[(usize, usize)]) -> (MovePlan, BTreeSet<MatchId>) {
        let user_tokens = tokenize(user);
        let original_tokens = tokenize(reference);
        let matches: Vec<Match> = pairs
            .iter()
            .enumerate()
            .map(|(id, &(u, o))| Match {
                id,
                user_index: u,
                orig_index: o,
                user_token: user_tokens[u].clone(),
                orig_token: original_tokens[o].clone(),
                score: 1.0,
                exact: user_tokens[u].raw == original_tokens[o].raw,
            })
            .collect();
        let origs: Vec<usize> = matches.iter().map(|m| m.orig_index).collect();
        let backbone: BTreeSet<MatchId> = longest_increasing_subsequence(&origs)
            .into_iter()
            .map(|i| matches[i].id)
            .collect();
        let plan = build_move_plan(&matches, &backbone, &user_tokens, &original_tokens);
        (plan, backbone)
    }

    #[test]
    fn test_in_order_has_no_blocks() {
        let (plan, backbone) = plan_for("a b c", "a b c", &[(0, 0), (1, 1), (2, 2)]);
        assert_eq!(backbone.len(), 3);
        assert!(plan.move_blocks.is_empty());
        assert!(plan.rewrite_groups.is_empty());
        assert!(plan.gaps_needed.is_empty());
        assert_eq!(plan.token_meta[1].role, TokenRole::Backbone(1));
        assert_eq!(plan.token_meta[1].target_gap, Some(GapKey::new(Some(0), Some(2))));
    }

    #[test]
    fn test_swap_produces_single_move() {
        // user: I see a car red / reference: I see a red car
        let (plan, backbone) = plan_for(
            "I see a car red",
            "I see a red car",
            &[(0, 0), (1, 1), (2, 2), (3, 4), (4, 3)],
        );
        assert_eq!(backbone, BTreeSet::from([0, 1, 2, 4]));
        assert_eq!(plan.move_blocks.len(), 1);

        let block = &plan.move_blocks[0];
        assert_eq!(block.tokens, vec![3]);
        assert_eq!(block.target_gap, GapKey::new(Some(3), None));
        assert!(!block.resolved_by_rewrite);
        assert_eq!(plan.token_meta[3].role, TokenRole::MoveMember(0));
        assert!(plan.token_meta[3].needs_move());
        assert!(plan.gaps_needed.contains(&GapKey::new(Some(3), None)));
    }

    #[test]
    fn test_adjacent_moves_join_one_block() {
        // user: a d e b c / reference: a b c d e
        let (plan, _) = plan_for("a d e b c", "a b c d e", &[(0, 0), (1, 3), (2, 4), (3, 1), (4, 2)]);
        assert_eq!(plan.move_blocks.len(), 1);
        assert_eq!(plan.move_blocks[0].tokens, vec![1, 2]);
        assert_eq!(plan.move_blocks[0].start, 1);
        assert_eq!(plan.move_blocks[0].end, 2);
        assert_eq!(plan.move_blocks[0].target_gap, GapKey::new(Some(2), None));
        assert!(plan.rewrite_groups.is_empty());
    }

    #[test]
    fn test_reversed_run_splits_blocks_and_merges_into_rewrite() {
        // user: a d c b / reference: a b c d
        let (plan, _) = plan_for("a d c b", "a b c d", &[(0, 0), (1, 3), (2, 2), (3, 1)]);
        assert_eq!(plan.move_blocks.len(), 2);
        assert!(plan.move_blocks.iter().all(|b| b.resolved_by_rewrite));
        assert_eq!(plan.rewrite_groups.len(), 1);

        let group = &plan.rewrite_groups[0];
        assert_eq!(group.target_gap, GapKey::new(Some(1), None));
        assert_eq!((group.start, group.end), (1, 3));
        assert_eq!(group.correct_text, "c d");
        for i in 1..=3 {
            assert_eq!(plan.token_meta[i].role, TokenRole::RewriteMember(0));
        }
        assert_eq!(plan.token_meta[0].role, TokenRole::Backbone(0));
    }

    #[test]
    fn test_rewrite_trims_trailing_punctuation() {
        // user: a d c b . / reference: a b c d .
        let (plan, _) = plan_for(
            "a d c b .",
            "a b c d .",
            &[(0, 0), (1, 3), (2, 2), (3, 1), (4, 4)],
        );
        assert_eq!(plan.rewrite_groups.len(), 1);
        let group = &plan.rewrite_groups[0];
        assert_eq!(group.target_gap, GapKey::new(Some(1), Some(4)));
        assert_eq!((group.start, group.end), (1, 3));
        assert_eq!(group.correct_text, "c d");
        assert_eq!(plan.token_meta[4].role, TokenRole::Backbone(4));
    }

    #[test]
    fn test_rewrite_keeps_trailing_punctuation_of_merged_block() {
        let result = crate::compare::compare("b . huset hus ,", ", hus b d , hus huset .").unwrap();
        let plan = &result.move_plan;
        assert!(!plan.rewrite_groups.is_empty());

        for block in plan.move_blocks.iter().filter(|b| b.resolved_by_rewrite) {
            let group = plan
                .rewrite_groups
                .iter()
                .find(|g| g.target_gap == block.target_gap)
                .expect("resolved block has a rewrite group");
            assert!(group.start <= block.start && block.end <= group.end);
            for &i in &block.tokens {
                assert!(matches!(plan.token_meta[i].role, TokenRole::RewriteMember(_)));
            }
        }

        // a MoveMember role always points at a block still awaiting its move
        for meta in &plan.token_meta {
            if let TokenRole::MoveMember(id) = meta.role {
                assert!(!plan.move_block(id).unwrap().resolved_by_rewrite);
            }
        }
    }

    #[test]
    fn test_blocks_split_by_backbone_share_gap() {
        // user: c a d b e / reference: a b c d e
        let (plan, backbone) = plan_for(
            "c a d b e",
            "a b c d e",
            &[(0, 2), (1, 0), (2, 3), (3, 1), (4, 4)],
        );
        assert_eq!(backbone, BTreeSet::from([1, 3, 4]));
        assert_eq!(plan.move_blocks.len(), 2);
        assert_eq!(plan.rewrite_groups.len(), 1);

        let group = &plan.rewrite_groups[0];
        assert_eq!(group.target_gap, GapKey::new(Some(1), Some(4)));
        assert_eq!((group.start, group.end), (0, 4));
        assert_eq!(group.correct_text, "c d e");
    }

    #[test]
    fn test_extras_keep_extra_role() {
        let (plan, _) = plan_for("a x b", "a b", &[(0, 0), (2, 1)]);
        assert_eq!(plan.token_meta[1], TokenMeta::extra());
    }

    #[test]
    fn test_gap_meta_records_user_positions() {
        let (plan, _) = plan_for(
            "I see a car red",
            "I see a red car",
            &[(0, 0), (1, 1), (2, 2), (3, 4), (4, 3)],
        );
        let meta = plan.gap_meta[&GapKey::new(Some(3), None)];
        assert_eq!(meta.before_user, Some(4));
        assert_eq!(meta.after_user, None);
    }

    #[test]
    fn test_block_invariants() {
        let (plan, _) = plan_for(
            "e d c b a",
            "a b c d e",
            &[(0, 4), (1, 3), (2, 2), (3, 1), (4, 0)],
        );
        for block in &plan.move_blocks {
            assert!(block.tokens.windows(2).all(|w| w[1] == w[0] + 1));
            assert_eq!(block.start, block.tokens[0]);
            assert_eq!(block.end, *block.tokens.last().unwrap());
        }
    }
}
