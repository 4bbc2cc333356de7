//! Regex and literal search over a piece tree.
//!
//! Single-line patterns are matched line by line; patterns that can span
//! lines run over the LF-normalized text of the searched range.

pub mod params;
pub mod searcher;
pub mod text_model_search;
pub mod word_classifier;

pub use params::{SearchData, SearchParams};
pub use searcher::{FindMatch, LineFeedCounter, PieceTreeSearcher};
pub use text_model_search::{
    find_matches, find_matches_in_ranges, find_next_match, find_next_match_in_ranges,
    find_previous_match, find_previous_match_in_ranges, SearchRangeSet, DEFAULT_LIMIT,
};
pub use word_classifier::{WordCharacterClassifier, DEFAULT_WORD_SEPARATORS};
