//! Text utilities (C2), longest-common-subsequence (C3), and character-level
//! diff with Levenshtein distance (C4).
//!
//! Grounded on `examples/original_source/src/markdowndiff/utils.py`
//! (`cleanup_whitespace`, `splitString`, `diff_wordsToCharsMunge`,
//! `longest_common_subsequence`) and the well-known diff-match-patch
//! `diff_levenshtein` heuristic for C4.

mod chardiff;
mod lcs;
mod normalize;
mod wordchars;

pub use chardiff::{diff_main, levenshtein, DiffOp};
pub use lcs::longest_common_subsequence;
pub use normalize::{normalize_whitespace, tokenize};
pub use wordchars::{chars_to_words, words_to_chars};
