//! Search request parsing.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::word_classifier::WordCharacterClassifier;
use crate::error::PieceTreeError;

/// `.` in a user pattern never matches a line terminator
const WILDCARD_CLASS: &str = r"[^\n\r\u{2028}\u{2029}]";

/// A find request as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub search_string: String,
    pub is_regex: bool,
    pub match_case: bool,
    /// Whole-word search when set
    pub word_separators: Option<String>,
}

/// A compiled search request
#[derive(Debug, Clone)]
pub struct SearchData {
    pub regex: Regex,
    pub word_separators: Option<Arc<WordCharacterClassifier>>,
    /// Set for literal single-line searches that can skip the regex engine
    pub simple_search: Option<String>,
    pub is_multiline: bool,
    pub is_case_sensitive: bool,
}

impl SearchParams {
    pub fn new(
        search_string: impl Into<String>,
        is_regex: bool,
        match_case: bool,
        word_separators: Option<String>,
    ) -> Self {
        SearchParams {
            search_string: search_string.into(),
            is_regex,
            match_case,
            word_separators,
        }
    }

    /// Compile the request; an empty search string yields `Ok(None)`
    pub fn try_parse_search_request(&self) -> Result<Option<SearchData>, PieceTreeError> {
        if self.search_string.is_empty() {
            return Ok(None);
        }

        let is_multiline = is_multiline_pattern(&self.search_string, self.is_regex);
        let pattern = if self.is_regex {
            rewrite_wildcards(&self.search_string)
        } else {
            regex::escape(&self.search_string)
        };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!self.match_case)
            .multi_line(is_multiline)
            .build()?;

        let simple_search = if !self.is_regex
            && !is_multiline
            && (self.match_case || !has_case_variance(&self.search_string))
        {
            Some(self.search_string.clone())
        } else {
            None
        };

        let word_separators = self
            .word_separators
            .as_deref()
            .filter(|separators| !separators.is_empty())
            .map(WordCharacterClassifier::cached);

        Ok(Some(SearchData {
            regex,
            word_separators,
            simple_search,
            is_multiline,
            is_case_sensitive: self.match_case,
        }))
    }

    /// Compile the request; empty strings and invalid patterns yield `None`
    pub fn parse_search_request(&self) -> Option<SearchData> {
        match self.try_parse_search_request() {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(pattern = %self.search_string, error = %err, "rejected search pattern");
                None
            }
        }
    }
}

fn has_case_variance(text: &str) -> bool {
    text.to_lowercase() != text.to_uppercase()
}

/// Literal searches are multiline when they contain LF; regexes when they
/// contain LF or a `\n`, `\r` or `\W` escape
fn is_multiline_pattern(search_string: &str, is_regex: bool) -> bool {
    if !is_regex {
        return search_string.contains('\n');
    }
    let mut chars = search_string.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\n' => return true,
            '\\' => {
                if matches!(chars.next(), Some('n' | 'r' | 'W')) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Replace unescaped `.` outside character classes with a class that stops at
/// every line terminator
fn rewrite_wildcards(pattern: &str) -> String {
    if !pattern.contains('.') {
        return pattern.to_string();
    }
    let mut out = String::with_capacity(pattern.len());
    let mut in_class = false;
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                out.push(ch);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(ch);
            }
            ']' if in_class => {
                in_class = false;
                out.push(ch);
            }
            '.' if !in_class => out.push_str(WILDCARD_CLASS),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_search_string_is_none() {
        let params = SearchParams::new("", false, false, None);
        assert!(params.parse_search_request().is_none());
        assert!(matches!(params.try_parse_search_request(), Ok(None)));
    }

    #[test]
    fn test_invalid_regex() {
        let params = SearchParams::new("(", true, false, None);
        assert!(params.parse_search_request().is_none());
        assert!(matches!(
            params.try_parse_search_request(),
            Err(PieceTreeError::InvalidSearchPattern(_))
        ));
    }

    #[test]
    fn test_literal_is_escaped() {
        let data = SearchParams::new("a.b", false, true, None)
            .parse_search_request()
            .unwrap();
        assert!(data.regex.is_match("xa.by"));
        assert!(!data.regex.is_match("axb"));
        assert_eq!(data.simple_search.as_deref(), Some("a.b"));
    }

    #[test]
    fn test_simple_search_needs_case_match_or_no_case() {
        let data = SearchParams::new("Foo", false, false, None)
            .parse_search_request()
            .unwrap();
        assert!(data.simple_search.is_none());
        assert!(data.regex.is_match("FOO"));

        let data = SearchParams::new("123", false, false, None)
            .parse_search_request()
            .unwrap();
        assert_eq!(data.simple_search.as_deref(), Some("123"));
    }

    #[test]
    fn test_multiline_detection() {
        assert!(is_multiline_pattern("a\nb", false));
        assert!(!is_multiline_pattern("a\\nb", false));
        assert!(is_multiline_pattern("a\\nb", true));
        assert!(is_multiline_pattern("a\\r", true));
        assert!(is_multiline_pattern("\\W", true));
        assert!(!is_multiline_pattern("\\w+", true));
        assert!(!is_multiline_pattern("\\\\n", true));
    }

    #[test]
    fn test_wildcard_stops_at_line_terminators() {
        let data = SearchParams::new("a.c", true, true, None)
            .parse_search_request()
            .unwrap();
        assert!(data.regex.is_match("abc"));
        assert!(data.regex.is_match("a\u{1F600}c"));
        assert!(!data.regex.is_match("a\rc"));
        assert!(!data.regex.is_match("a\u{2028}c"));
        assert_eq!(rewrite_wildcards(r"\.[.]"), r"\.[.]");
    }

    #[test]
    fn test_unicode_escapes() {
        let data = SearchParams::new(r"\u{1F600}", true, true, None)
            .parse_search_request()
            .unwrap();
        assert!(data.regex.is_match("x\u{1F600}"));
    }

    #[test]
    fn test_word_separators_attach_classifier() {
        let data = SearchParams::new("foo", false, true, Some(" ".to_string()))
            .parse_search_request()
            .unwrap();
        assert!(data.word_separators.is_some());
        let data = SearchParams::new("foo", false, true, Some(String::new()))
            .parse_search_request()
            .unwrap();
        assert!(data.word_separators.is_none());
    }
}
