//! Dictation - answer comparison engine for dictation exercises
//!
//! Grades a learner's typed answer against the reference text: tokens are
//! paired by an optimal assignment over a stem-aware similarity score, the
//! longest in-order run of pairs becomes the backbone, and everything else is
//! explained as misspellings, moves, rewrites, extras and omissions.

pub mod assignment;
pub mod compare;
pub mod config;
pub mod error;
pub mod ffi;
pub mod layout;
pub mod missing;
pub mod order;
pub mod planner;
pub mod similarity;
pub mod tokenizer;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

// Export FFI functions at crate root for C header generation
pub use ffi::*;

/// Re-export the main engine components for convenience
pub use compare::{Comparator, compare, compare_json};
pub use config::CompareConfig;
pub use layout::{ReferenceSegment, TokenStatus, UserSegment, reference_line, user_line};
pub use similarity::SimilarityScorer;
pub use tokenizer::tokenize;
