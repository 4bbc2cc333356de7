// Property-based tests using proptest
// These tests generate random sequences of edits and verify tree invariants

mod common;

use common::harness::ShadowHarness;
use piece_tree::model::{DefaultEndOfLine, PieceTreeBuilder};
use piece_tree::PieceTreeBuffer;
use proptest::prelude::*;

/// Generate random edit operations
#[derive(Debug, Clone)]
enum EditOp {
    Insert { seed: usize, text: String },
    Delete { seed: usize, len: usize },
}

impl EditOp {
    /// Apply this operation, mapping the seed onto a valid offset
    fn apply(&self, harness: &mut ShadowHarness) {
        match self {
            Self::Insert { seed, text } => {
                let offset = seed % (harness.len() + 1);
                harness.insert(offset, text);
            }
            Self::Delete { seed, len } => {
                if harness.len() == 0 {
                    return;
                }
                let offset = seed % harness.len();
                let count = (*len).min(harness.len() - offset);
                harness.delete(offset, count);
            }
        }
    }

    /// Apply this operation to a normalized document, writing `eol` for every line break
    ///
    /// Edits that would land between a CR and its LF are skipped.
    fn apply_keeping_eol(&self, harness: &mut ShadowHarness, eol: &str) {
        match self {
            Self::Insert { seed, text } => {
                let offset = seed % (harness.len() + 1);
                if !harness.splits_crlf(offset) {
                    harness.insert(offset, &text.replace('\n', eol));
                }
            }
            Self::Delete { seed, len } => {
                if harness.len() == 0 {
                    return;
                }
                let offset = seed % harness.len();
                let count = (*len).min(harness.len() - offset);
                if !harness.splits_crlf(offset) && !harness.splits_crlf(offset + count) {
                    harness.delete(offset, count);
                }
            }
        }
    }
}

fn fragment_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["a", "b", "xyz", " ", "\n", "\r", "\r\n", "é", "\t"]),
        1..8,
    )
    .prop_map(|parts| parts.concat())
}

/// Strategy for generating random edit operations
fn edit_op_strategy() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        3 => (any::<usize>(), fragment_strategy())
            .prop_map(|(seed, text)| EditOp::Insert { seed, text }),
        2 => (any::<usize>(), 1..12usize)
            .prop_map(|(seed, len)| EditOp::Delete { seed, len }),
    ]
}

/// Fragments whose only line break is "\n", rewritten to the document EOL when applied
fn single_eol_fragment_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["a", "b", "xyz", " ", "\n", "é", "\t"]),
        1..8,
    )
    .prop_map(|parts| parts.concat())
}

fn single_eol_edit_strategy() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        3 => (any::<usize>(), single_eol_fragment_strategy())
            .prop_map(|(seed, text)| EditOp::Insert { seed, text }),
        2 => (any::<usize>(), 1..12usize)
            .prop_map(|(seed, len)| EditOp::Delete { seed, len }),
    ]
}

fn initial_chunks_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(fragment_strategy(), 0..4)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    /// Property test: piece tree should always match shadow string after any sequence of edits
    #[test]
    fn prop_piece_tree_matches_shadow(
        chunks in initial_chunks_strategy(),
        ops in prop::collection::vec(edit_op_strategy(), 1..50),
    ) {
        let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let mut harness = ShadowHarness::new(&chunks);
        for op in &ops {
            op.apply(&mut harness);
            let checked = harness.check();
            prop_assert!(checked.is_ok(), "{:?} after {:?}", checked, op);
        }
    }

    /// Property test: tiny chunks put nearly every character in its own piece
    #[test]
    fn prop_small_chunks_match_shadow(
        chunks in initial_chunks_strategy(),
        ops in prop::collection::vec(edit_op_strategy(), 1..40),
    ) {
        let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let mut harness = ShadowHarness::with_chunk_size(&chunks, 3);
        for op in &ops {
            op.apply(&mut harness);
        }
        let checked = harness.check();
        prop_assert!(checked.is_ok(), "{:?}\nOperations: {:#?}", checked, ops);
    }

    /// Property test: a document normalized to one EOL stays normalized and matches the shadow
    #[test]
    fn prop_normalized_documents_match_shadow(
        crlf in any::<bool>(),
        initial in prop::collection::vec(single_eol_fragment_strategy(), 0..4),
        ops in prop::collection::vec(single_eol_edit_strategy(), 1..50),
    ) {
        let eol = if crlf { "\r\n" } else { "\n" };
        let mut harness = ShadowHarness::normalized(&initial.concat().replace('\n', eol), eol);
        prop_assert_eq!(harness.buffer.get_eol(), eol);
        prop_assert!(harness.buffer.model().is_eol_normalized());
        let checked = harness.check();
        prop_assert!(checked.is_ok(), "{:?} after load", checked);

        for op in &ops {
            op.apply_keeping_eol(&mut harness, eol);
            prop_assert!(harness.buffer.model().is_eol_normalized(), "lost normalization after {:?}", op);
            let checked = harness.check();
            prop_assert!(checked.is_ok(), "{:?} after {:?}", checked, op);
        }
    }

    /// Property test: offset -> position -> offset is the identity
    #[test]
    fn prop_offset_position_inverse(
        ops in prop::collection::vec(edit_op_strategy(), 1..30),
    ) {
        let mut harness = ShadowHarness::new(&[]);
        for op in &ops {
            op.apply(&mut harness);
        }
        let buffer = &harness.buffer;
        for offset in 0..=buffer.len() {
            let position = buffer.get_position_at(offset);
            prop_assert_eq!(
                buffer.get_offset_at(position.line_number, position.column),
                offset,
                "position {:?}",
                position
            );
        }
    }

    /// Property test: warm and cold node caches give identical answers
    #[test]
    fn prop_cache_is_transparent(
        ops in prop::collection::vec(edit_op_strategy(), 1..30),
        samples in prop::collection::vec(any::<usize>(), 1..20),
    ) {
        let mut harness = ShadowHarness::new(&["seed\ntext"]);
        for op in &ops {
            op.apply(&mut harness);
        }
        let text = harness.shadow_text();
        let warm = &harness.buffer;
        let cold = || PieceTreeBuffer::from_chunks([text.as_str()], false);

        for sample in samples {
            let offset = sample % (warm.len() + 1);
            let line = sample % warm.get_line_count() + 1;
            prop_assert_eq!(warm.get_position_at(offset), cold().get_position_at(offset));
            prop_assert_eq!(warm.get_char_code(offset), cold().get_char_code(offset));
            prop_assert_eq!(warm.get_line_content(line), cold().get_line_content(line));
            prop_assert_eq!(warm.get_offset_at(line, 1), cold().get_offset_at(line, 1));
            // asked twice, the second answer may come from the cache
            prop_assert_eq!(warm.get_line_content(line), warm.get_line_content(line));
        }
    }

    /// Property test: normalizing line endings twice equals normalizing once
    #[test]
    fn prop_normalize_eol_idempotent(
        chunks in initial_chunks_strategy(),
        crlf in any::<bool>(),
    ) {
        let eol = if crlf { "\r\n" } else { "\n" };
        let mut buffer = PieceTreeBuffer::from_chunks(chunks.iter().map(String::as_str), false);
        let lines_before = buffer.get_line_count();

        buffer.set_eol(eol).unwrap();
        let once = buffer.get_text();
        buffer.set_eol(eol).unwrap();
        prop_assert_eq!(&buffer.get_text(), &once);
        prop_assert_eq!(buffer.get_line_count(), lines_before);
        prop_assert!(buffer.check_integrity().is_ok());
    }

    /// Property test: the builder keeps the text no matter how it is chunked
    #[test]
    fn prop_builder_preserves_text(chunks in initial_chunks_strategy()) {
        let result = PieceTreeBuilder::build_from_chunks(chunks.iter(), false, DefaultEndOfLine::Lf);
        prop_assert_eq!(result.model.get_text(), chunks.concat());
        prop_assert!(result.model.check_integrity().is_ok());
    }
}

#[test]
fn test_insert_example_from_docs() {
    common::init_tracing();
    let mut buffer = PieceTreeBuffer::new("a\nb\n");
    buffer.insert(1, "X");
    assert_eq!(buffer.get_text(), "aX\nb\n");
    assert_eq!(buffer.get_line_count(), 3);
    assert_eq!(buffer.get_line_content(3), "");
}
