//! Core types shared by every stage of the comparison

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a match, unique within one comparison
pub type MatchId = usize;

/// Identifier of a move block, unique within one comparison
pub type MoveBlockId = usize;

/// Identifier of a rewrite group, unique within one comparison
pub type RewriteGroupId = usize;

/// Whether a token is a word or a single punctuation character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Word,
    Punct,
}

/// A token of either the learner's answer or the reference text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Text as typed
    pub raw: String,
    /// Lowercased form
    pub norm: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Position in its own sequence
    pub index: usize,
}

impl Token {
    pub fn new(raw: impl Into<String>, kind: TokenKind, index: usize) -> Self {
        let raw = raw.into();
        let norm = raw.to_lowercase();
        Self {
            raw,
            norm,
            kind,
            index,
        }
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    pub fn is_punct(&self) -> bool {
        self.kind == TokenKind::Punct
    }
}

/// An accepted pairing of a user token with a reference token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub user_index: usize,
    pub orig_index: usize,
    pub user_token: Token,
    pub orig_token: Token,
    pub score: f64,
    /// Raw forms are identical
    pub exact: bool,
}

/// An insertion point in the reference sequence, bounded by backbone tokens.
///
/// `before == None` is the point before everything, `after == None` is END.
/// Serialized as `"<before>-<after>"` with `-1` and `END` for the open ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GapKey {
    pub before: Option<usize>,
    pub after: Option<usize>,
}

impl GapKey {
    pub fn new(before: Option<usize>, after: Option<usize>) -> Self {
        Self { before, after }
    }

    /// Reference index of the first token that belongs inside this gap
    pub fn first_slot(&self) -> usize {
        self.before.map_or(0, |b| b + 1)
    }

    pub fn is_end(&self) -> bool {
        self.after.is_none()
    }

    fn sort_key(&self) -> (i64, i64) {
        (
            self.before.map_or(-1, |b| b as i64),
            self.after.map_or(i64::MAX, |a| a as i64),
        )
    }
}

impl Ord for GapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for GapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.before {
            Some(b) => write!(f, "{b}-")?,
            None => write!(f, "-1-")?,
        }
        match self.after {
            Some(a) => write!(f, "{a}"),
            None => write!(f, "END"),
        }
    }
}

impl FromStr for GapKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("malformed gap key: {s:?}"));
        let (before, after) = match s.strip_prefix("-1-") {
            Some(rest) => (None, rest),
            None => {
                let (b, a) = s.split_once('-').ok_or_else(invalid)?;
                (Some(b.parse::<usize>().map_err(|_| invalid())?), a)
            }
        };
        let after = match after {
            "END" => None,
            a => Some(a.parse::<usize>().map_err(|_| invalid())?),
        };
        Ok(Self { before, after })
    }
}

impl From<GapKey> for String {
    fn from(key: GapKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for GapKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Where a gap sits in the user's sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapMeta {
    pub key: GapKey,
    /// User index of the backbone token at `key.before`
    pub before_user: Option<usize>,
    /// User index of the backbone token at `key.after`
    pub after_user: Option<usize>,
}

/// A contiguous run of out-of-order user tokens headed to one gap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBlock {
    pub id: MoveBlockId,
    /// User indices, contiguous and ascending
    pub tokens: Vec<usize>,
    pub start: usize,
    pub end: usize,
    pub target_gap: GapKey,
    /// Some member is also misspelled
    pub has_error: bool,
    pub resolved_by_rewrite: bool,
}

/// Two or more move blocks sharing a gap, shown as one corrected phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteGroup {
    pub id: RewriteGroupId,
    pub start: usize,
    pub end: usize,
    pub target_gap: GapKey,
    pub correct_text: String,
}

/// The part a user token plays in the correction plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "camelCase")]
pub enum TokenRole {
    Backbone(MatchId),
    MoveMember(MoveBlockId),
    RewriteMember(RewriteGroupId),
    Extra,
}

/// Per-token annotations, indexed by user position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMeta {
    pub role: TokenRole,
    pub match_id: Option<MatchId>,
    pub target_gap: Option<GapKey>,
    /// Matched but spelled differently
    pub has_error: bool,
}

impl TokenMeta {
    pub fn extra() -> Self {
        Self {
            role: TokenRole::Extra,
            match_id: None,
            target_gap: None,
            has_error: false,
        }
    }

    pub fn needs_move(&self) -> bool {
        matches!(self.role, TokenRole::MoveMember(_))
    }
}

/// A user token with no acceptable reference partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraToken {
    pub user_index: usize,
    pub token: Token,
}

/// A reference token the user left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingToken {
    pub orig_index: usize,
    pub token: Token,
}

/// A missing reference token placed in the user's sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingAnchor {
    pub orig_index: usize,
    pub token: Token,
    pub gap: GapKey,
}

/// The full set of correction instructions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePlan {
    pub move_blocks: Vec<MoveBlock>,
    pub rewrite_groups: Vec<RewriteGroup>,
    pub token_meta: Vec<TokenMeta>,
    pub gap_meta: BTreeMap<GapKey, GapMeta>,
    pub gaps_needed: BTreeSet<GapKey>,
    /// Keyed by the user position the missing tokens are inserted before
    pub missing_by_position: BTreeMap<usize, Vec<MissingAnchor>>,
}

impl MovePlan {
    pub fn move_block(&self, id: MoveBlockId) -> Option<&MoveBlock> {
        self.move_blocks.iter().find(|b| b.id == id)
    }

    pub fn rewrite_group(&self, id: RewriteGroupId) -> Option<&RewriteGroup> {
        self.rewrite_groups.iter().find(|g| g.id == id)
    }

    pub fn unresolved_blocks(&self) -> impl Iterator<Item = &MoveBlock> {
        self.move_blocks.iter().filter(|b| !b.resolved_by_rewrite)
    }
}

/// Error count split by divergence class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBreakdown {
    pub extras: usize,
    pub missing: usize,
    pub spelling: usize,
    pub order: usize,
    pub moves: usize,
}

impl ErrorBreakdown {
    pub fn total(&self) -> usize {
        self.extras + self.missing + self.spelling + self.order + self.moves
    }
}

/// Everything a renderer needs to show the correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub is_correct: bool,
    pub user_tokens: Vec<Token>,
    pub original_tokens: Vec<Token>,
    /// Sorted by user index
    pub matches: Vec<Match>,
    /// Ids of the matches that are already correct and in order
    pub backbone: BTreeSet<MatchId>,
    pub extras: Vec<ExtraToken>,
    pub missing: Vec<MissingToken>,
    pub move_plan: MovePlan,
    pub error_count: usize,
    pub breakdown: ErrorBreakdown,
}

impl ComparisonResult {
    pub fn is_backbone(&self, id: MatchId) -> bool {
        self.backbone.contains(&id)
    }

    pub fn match_by_id(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn match_for_user(&self, user_index: usize) -> Option<&Match> {
        self.matches.iter().find(|m| m.user_index == user_index)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
