//! Anchoring of omitted reference tokens in the user's answer

use std::collections::BTreeMap;

use crate::types::{GapKey, Match, MissingAnchor, MissingToken};

/// Place every missing reference token just after the user token matched to
/// the nearest preceding reference token (position 0 when nothing precedes).
///
/// The map is keyed by the user position the tokens are inserted before;
/// `user_tokens.len()` stands for the end of the answer. Each list is in
/// reference order.
pub fn missing_by_position(
    missing: &[MissingToken],
    matches: &[Match],
) -> BTreeMap<usize, Vec<MissingAnchor>> {
    let mut anchored: BTreeMap<usize, Vec<MissingAnchor>> = BTreeMap::new();
    if missing.is_empty() {
        return anchored;
    }

    let user_by_orig: BTreeMap<usize, usize> =
        matches.iter().map(|m| (m.orig_index, m.user_index)).collect();

    let mut sorted: Vec<&MissingToken> = missing.iter().collect();
    sorted.sort_by_key(|item| item.orig_index);

    for item in sorted {
        let preceding = user_by_orig.range(..item.orig_index).next_back();
        let following = user_by_orig.range(item.orig_index + 1..).next();

        let position = preceding.map_or(0, |(_, &user)| user + 1);
        let gap = GapKey::new(
            preceding.map(|(&orig, _)| orig),
            following.map(|(&orig, _)| orig),
        );

        anchored.entry(position).or_default().push(MissingAnchor {
            orig_index: item.orig_index,
            token: item.token.clone(),
            gap,
        });
    }

    for list in anchored.values_mut() {
        list.sort_by_key(|anchor| anchor.orig_index);
    }
    anchored
}
