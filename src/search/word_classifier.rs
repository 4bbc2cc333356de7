//! Word boundary classification for whole-word search.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock};

use lru::LruCache;

/// Separators used when none are configured
pub const DEFAULT_WORD_SEPARATORS: &str = "`~!@#$%^&*()-=+[{]}\\|;:'\",.<>/?";

const CLASSIFIER_CACHE_SIZE: usize = 10;

/// Classifiers keyed by separator string, shared process-wide
static CLASSIFIER_CACHE: OnceLock<Mutex<LruCache<String, Arc<WordCharacterClassifier>>>> =
    OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCharacterClass {
    Regular,
    Whitespace,
    WordSeparator,
}

/// Maps characters to word classes
#[derive(Debug, Clone)]
pub struct WordCharacterClassifier {
    classes: HashMap<char, WordCharacterClass>,
}

impl WordCharacterClassifier {
    pub fn new(separators: &str) -> Self {
        let mut classes: HashMap<char, WordCharacterClass> = separators
            .chars()
            .map(|ch| (ch, WordCharacterClass::WordSeparator))
            .collect();
        for ch in [' ', '\t', '\r', '\n'] {
            classes.insert(ch, WordCharacterClass::Whitespace);
        }
        WordCharacterClassifier { classes }
    }

    /// Shared classifier for `separators`, built on first use
    pub fn cached(separators: &str) -> Arc<WordCharacterClassifier> {
        let cache = CLASSIFIER_CACHE.get_or_init(|| {
            Mutex::new(LruCache::new(
                NonZeroUsize::new(CLASSIFIER_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            ))
        });
        let mut cache = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(classifier) = cache.get(separators) {
            return Arc::clone(classifier);
        }
        let classifier = Arc::new(WordCharacterClassifier::new(separators));
        cache.put(separators.to_string(), Arc::clone(&classifier));
        classifier
    }

    pub fn get(&self, ch: char) -> WordCharacterClass {
        self.classes
            .get(&ch)
            .copied()
            .unwrap_or(WordCharacterClass::Regular)
    }

    fn is_separator(&self, ch: char) -> bool {
        self.get(ch) != WordCharacterClass::Regular
    }

    /// Whether the match `[start, end)` (byte offsets into `text`) sits on word
    /// boundaries at both ends
    pub fn is_valid_match(&self, text: &str, start: usize, end: usize) -> bool {
        if text.is_empty() {
            return true;
        }
        self.left_is_boundary(text, start, end) && self.right_is_boundary(text, start, end)
    }

    fn left_is_boundary(&self, text: &str, start: usize, end: usize) -> bool {
        let Some(before) = text[..start].chars().next_back() else {
            return true;
        };
        if is_line_break(before) || self.is_separator(before) {
            return true;
        }
        if end > start {
            if let Some(first) = text[start..end].chars().next() {
                return self.is_separator(first);
            }
        }
        false
    }

    fn right_is_boundary(&self, text: &str, start: usize, end: usize) -> bool {
        let Some(after) = text[end..].chars().next() else {
            return true;
        };
        if is_line_break(after) || self.is_separator(after) {
            return true;
        }
        if end > start {
            if let Some(last) = text[start..end].chars().next_back() {
                return self.is_separator(last);
            }
        }
        false
    }
}

fn is_line_break(ch: char) -> bool {
    ch == '\n' || ch == '\r'
}
