//! Article-version diff engine.
//!
//! A version's diff is computed against the content of the immediately
//! preceding version of the same article. The raw alignment comes from a
//! Myers diff (via the `similar` crate) and is then passed through
//! [`cleanup_semantic`], which trades minimality for spans a human can read.
//!
//! Myers work is bounded by [`MYERS_BUDGET`] instead of a clock, so the
//! output depends only on the two texts. Common prefixes and suffixes are
//! stripped first. What remains is diffed per character when affordable,
//! otherwise per line with a character pass inside each changed hunk. A
//! hunk the budget cannot cover becomes a plain delete and insert.
//!
//! Every diff produced here satisfies two round-trip properties:
//!
//! - `Delete` + `Equal` spans, in order, rebuild the previous text
//!   ([`source_text`]);
//! - `Insert` + `Equal` spans, in order, rebuild the new text
//!   ([`target_text`]).

mod cleanup;

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, DiffTag, TextDiff};

pub use cleanup::{cleanup_merge, cleanup_semantic, cleanup_semantic_lossless};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The operation of a single diff span.
///
/// Serialized as the integers `-1`, `0` and `1`, which is the wire format
/// API consumers rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffOp {
    Delete,
    Equal,
    Insert,
}

impl DiffOp {
    /// Integer tag used on the wire and in the `diff` JSONB column.
    pub fn code(self) -> i8 {
        match self {
            Self::Delete => -1,
            Self::Equal => 0,
            Self::Insert => 1,
        }
    }

    /// Parse an integer tag back into an operation.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::Delete),
            0 => Some(Self::Equal),
            1 => Some(Self::Insert),
            _ => None,
        }
    }

    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Equal => "equal",
            Self::Insert => "insert",
        }
    }
}

impl fmt::Display for DiffOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiffOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.code())
    }
}

impl<'de> Deserialize<'de> for DiffOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        DiffOp::from_code(code).ok_or_else(|| {
            de::Error::invalid_value(de::Unexpected::Signed(code), &"one of -1, 0 or 1")
        })
    }
}

/// One tagged span of a diff: `{"type": -1|0|1, "text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSpan {
    #[serde(rename = "type")]
    pub op: DiffOp,
    pub text: String,
}

impl DiffSpan {
    pub fn new(op: DiffOp, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }
}

/// Character counts of what a diff inserts and deletes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub insertions: usize,
    pub deletions: usize,
    /// Edit distance implied by the spans; see [`levenshtein`].
    pub distance: usize,
}

/// Upper bound on the Myers work spent on one diff, counted as the sum of
/// `old_len * new_len` over every token-level run.
pub const MYERS_BUDGET: usize = 10_000_000;

struct Budget(usize);

impl Budget {
    /// Take the cost of diffing `old` against `new` tokens if it is still
    /// affordable. Nothing is taken otherwise.
    fn reserve(&mut self, old: usize, new: usize) -> bool {
        let cost = old.saturating_mul(new);
        if cost > self.0 {
            return false;
        }
        self.0 -= cost;
        true
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Compute the diff stored on a newly created article version.
///
/// `previous` is the content of the latest earlier version of the same
/// article, or `None` when this is the article's first version. The first
/// version always yields a single `Insert` span holding the whole content.
pub fn compute_version_diff(previous: Option<&str>, new: &str) -> Vec<DiffSpan> {
    match previous {
        None => vec![DiffSpan::new(DiffOp::Insert, new)],
        Some(previous) => cleanup_semantic(diff_main(previous, new)),
    }
}

/// Raw diff between two texts, with adjacent spans of the same operation
/// merged. No semantic cleanup is applied.
pub fn diff_main(old: &str, new: &str) -> Vec<DiffSpan> {
    if old == new {
        if old.is_empty() {
            return Vec::new();
        }
        return vec![DiffSpan::new(DiffOp::Equal, old)];
    }

    let prefix = common_prefix_len(old, new);
    let suffix = common_suffix_len(&old[prefix..], &new[prefix..]);
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut spans = Vec::new();
    let mut budget = Budget(MYERS_BUDGET);
    push_span(&mut spans, DiffOp::Equal, &old[..prefix]);
    if budget.reserve(old_mid.chars().count(), new_mid.chars().count()) {
        diff_chars(old_mid, new_mid, &mut spans);
    } else if budget.reserve(line_count(old_mid), line_count(new_mid)) {
        diff_lines(old_mid, new_mid, &mut budget, &mut spans);
    } else {
        replace(old_mid, new_mid, &mut spans);
    }
    push_span(&mut spans, DiffOp::Equal, &old[old.len() - suffix..]);

    cleanup_merge(spans)
}

/// Byte length of the common prefix, on a char boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

/// Byte length of the common suffix, on a char boundary.
fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

fn line_count(text: &str) -> usize {
    text.split_inclusive('\n').count()
}

fn push_span(spans: &mut Vec<DiffSpan>, op: DiffOp, text: &str) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.op == op => last.text.push_str(text),
        _ => spans.push(DiffSpan::new(op, text)),
    }
}

fn replace(old: &str, new: &str, spans: &mut Vec<DiffSpan>) {
    push_span(spans, DiffOp::Delete, old);
    push_span(spans, DiffOp::Insert, new);
}

fn diff_chars(old: &str, new: &str, spans: &mut Vec<DiffSpan>) {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(old, new);

    for change in diff.iter_all_changes() {
        let op = match change.tag() {
            ChangeTag::Equal => DiffOp::Equal,
            ChangeTag::Delete => DiffOp::Delete,
            ChangeTag::Insert => DiffOp::Insert,
        };
        push_span(spans, op, change.value());
    }
}

/// Line-level Myers, then a character pass inside each run of changed lines.
fn diff_lines(old: &str, new: &str, budget: &mut Budget, spans: &mut Vec<DiffSpan>) {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(old, new);
    let old_lines = diff.old_slices();
    let new_lines = diff.new_slices();

    let mut hunk_old = String::new();
    let mut hunk_new = String::new();
    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            flush_hunk(&mut hunk_old, &mut hunk_new, budget, spans);
            for line in &old_lines[old_range] {
                push_span(spans, DiffOp::Equal, line);
            }
        } else {
            old_lines[old_range].iter().for_each(|line| hunk_old.push_str(line));
            new_lines[new_range].iter().for_each(|line| hunk_new.push_str(line));
        }
    }
    flush_hunk(&mut hunk_old, &mut hunk_new, budget, spans);
}

fn flush_hunk(
    old: &mut String,
    new: &mut String,
    budget: &mut Budget,
    spans: &mut Vec<DiffSpan>,
) {
    if old.is_empty() && new.is_empty() {
        return;
    }
    if budget.reserve(old.chars().count(), new.chars().count()) {
        diff_chars(old, new, spans);
    } else {
        replace(old, new, spans);
    }
    old.clear();
    new.clear();
}

// ---------------------------------------------------------------------------
// Reconstruction and metrics
// ---------------------------------------------------------------------------

/// Rebuild the previous text from a diff (`Delete` and `Equal` spans).
pub fn source_text(spans: &[DiffSpan]) -> String {
    spans
        .iter()
        .filter(|s| s.op != DiffOp::Insert)
        .map(|s| s.text.as_str())
        .collect()
}

/// Rebuild the new text from a diff (`Insert` and `Equal` spans).
pub fn target_text(spans: &[DiffSpan]) -> String {
    spans
        .iter()
        .filter(|s| s.op != DiffOp::Delete)
        .map(|s| s.text.as_str())
        .collect()
}

/// Count inserted and deleted characters.
pub fn stats(spans: &[DiffSpan]) -> DiffStats {
    let mut acc = spans.iter().fold(DiffStats::default(), |mut acc, s| {
        let len = s.text.chars().count();
        match s.op {
            DiffOp::Insert => acc.insertions += len,
            DiffOp::Delete => acc.deletions += len,
            DiffOp::Equal => {}
        }
        acc
    });
    acc.distance = levenshtein(spans);
    acc
}

/// Levenshtein distance implied by a diff, in characters.
///
/// A deletion next to an insertion counts as substitutions, so each run of
/// edits between two equalities contributes the larger of its two sides.
pub fn levenshtein(spans: &[DiffSpan]) -> usize {
    let mut distance = 0;
    let mut insertions = 0;
    let mut deletions = 0;
    for span in spans {
        let len = span.text.chars().count();
        match span.op {
            DiffOp::Insert => insertions += len,
            DiffOp::Delete => deletions += len,
            DiffOp::Equal => {
                distance += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }
    distance + insertions.max(deletions)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use proptest::prelude::*;

    use super::*;

    const KAHLUA_V1: &str = "3 ice cubs, 1 part Kahlua, 2 part Vodka, fill with cream";
    const KAHLUA_V2: &str = "Add 3 ice cubs, 1 part Kahlua, 2 part Vodka, fill with cream.";

    /// Pairs exercised by the round-trip and determinism tests.
    fn corpus() -> Vec<(&'static str, &'static str)> {
        vec![
            ("", ""),
            ("", "hello world"),
            ("hello world", ""),
            ("abc", "abc"),
            ("abc", "xyz"),
            (KAHLUA_V1, KAHLUA_V2),
            ("The cat sat on the mat.", "The dog sat on the log."),
            ("line one\nline two\nline three\n", "line one\nline 2\nline three\nline four\n"),
            ("mouse", "sofas"),
            ("The quick brown fox", "The quick red fox jumps"),
            ("aaaaaaaa", "aaaabaaaa"),
            ("Just throw the damn thing.", "Just throw the thing, dude."),
            ("blåbærsyltetøy på brødskiva", "bringebærsyltetøy på skiva"),
            ("naïve café ☕", "naive cafe ☕ ☕"),
            ("xxxabc", "defxxx"),
            ("abcxxx", "xxxdef"),
            (".éb..aaa\nx\nx", "ééé x \n..aa"),
        ]
    }

    fn assert_coalesced(diff: &[DiffSpan]) {
        for pair in diff.windows(2) {
            assert_ne!(pair[0].op, pair[1].op, "adjacent spans share an op: {diff:?}");
        }
    }

    // -- compute_version_diff ------------------------------------------------

    #[test]
    fn first_version_is_single_insert() {
        let diff = compute_version_diff(None, "hello world");
        assert_eq!(diff, vec![DiffSpan::new(DiffOp::Insert, "hello world")]);
    }

    #[test]
    fn first_version_with_empty_content_is_still_an_insert() {
        let diff = compute_version_diff(None, "");
        assert_eq!(diff, vec![DiffSpan::new(DiffOp::Insert, "")]);
    }

    #[test]
    fn identical_texts_yield_single_equal() {
        let diff = compute_version_diff(Some(KAHLUA_V1), KAHLUA_V1);
        assert_eq!(diff, vec![DiffSpan::new(DiffOp::Equal, KAHLUA_V1)]);
    }

    #[test]
    fn identical_empty_texts_yield_no_spans() {
        assert!(compute_version_diff(Some(""), "").is_empty());
    }

    #[test]
    fn kahlua_scenario_prepends_and_appends() {
        let diff = compute_version_diff(Some(KAHLUA_V1), KAHLUA_V2);

        let inserted: Vec<&str> = diff
            .iter()
            .filter(|s| s.op == DiffOp::Insert)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(inserted, vec!["Add ", "."]);
        assert!(diff.iter().all(|s| s.op != DiffOp::Delete));

        assert_eq!(diff.len(), 3);
        assert_eq!(diff[0], DiffSpan::new(DiffOp::Insert, "Add "));
        assert_eq!(diff[1], DiffSpan::new(DiffOp::Equal, KAHLUA_V1));
        assert_eq!(diff[2], DiffSpan::new(DiffOp::Insert, "."));
    }

    #[test]
    fn round_trip_rebuilds_both_texts() {
        for (old, new) in corpus() {
            let diff = compute_version_diff(Some(old), new);
            assert_eq!(source_text(&diff), old, "previous text for {old:?} -> {new:?}");
            assert_eq!(target_text(&diff), new, "new text for {old:?} -> {new:?}");
        }
    }

    #[test]
    fn raw_diff_round_trips_too() {
        for (old, new) in corpus() {
            let diff = diff_main(old, new);
            assert_eq!(source_text(&diff), old);
            assert_eq!(target_text(&diff), new);
        }
    }

    #[test]
    fn output_is_deterministic() {
        for (old, new) in corpus() {
            let first = serde_json::to_string(&compute_version_diff(Some(old), new)).unwrap();
            for _ in 0..5 {
                let again = serde_json::to_string(&compute_version_diff(Some(old), new)).unwrap();
                assert_eq!(first, again);
            }
        }
    }

    #[test]
    fn no_empty_spans_after_cleanup() {
        for (old, new) in corpus() {
            let diff = compute_version_diff(Some(old), new);
            assert!(diff.iter().all(|s| !s.text.is_empty()), "{old:?} -> {new:?}");
        }
    }

    #[test]
    fn adjacent_spans_never_share_an_op() {
        for (old, new) in corpus() {
            assert_coalesced(&compute_version_diff(Some(old), new));
            assert_coalesced(&diff_main(old, new));
        }
    }

    #[test]
    fn emptied_equality_leaves_no_split_deletion() {
        let old = ".éb..aaa\nx\nx";
        let new = "ééé x \n..aa";
        let diff = compute_version_diff(Some(old), new);
        assert_coalesced(&diff);
        assert_eq!(source_text(&diff), old);
        assert_eq!(target_text(&diff), new);
    }

    // -- bounded work --------------------------------------------------------

    const LARGE: usize = 100_000;

    #[test]
    fn large_disjoint_rewrite_finishes_quickly() {
        let old = "a".repeat(LARGE);
        let new = "b".repeat(LARGE);

        let started = Instant::now();
        let diff = compute_version_diff(Some(&old), &new);
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());

        assert_eq!(
            diff,
            vec![
                DiffSpan::new(DiffOp::Delete, old.as_str()),
                DiffSpan::new(DiffOp::Insert, new.as_str()),
            ]
        );
    }

    #[test]
    fn large_disjoint_multiline_rewrite_finishes_quickly() {
        let old = "a\n".repeat(LARGE / 2);
        let new = "b\n".repeat(LARGE / 2);

        let started = Instant::now();
        let diff = compute_version_diff(Some(&old), &new);
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());

        assert_eq!(source_text(&diff), old);
        assert_eq!(target_text(&diff), new);
        assert_coalesced(&diff);
    }

    #[test]
    fn small_edits_in_large_document_stay_precise() {
        let paragraph = |i: usize, tail: &str| format!("Paragraph {i} says {tail}.\n");
        let old: String = (0..2000).map(|i| paragraph(i, "nothing much")).collect();
        let new: String = (0..2000)
            .map(|i| match i {
                10 | 1990 => paragraph(i, "something"),
                _ => paragraph(i, "nothing much"),
            })
            .collect();

        let started = Instant::now();
        let diff = compute_version_diff(Some(&old), &new);
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());

        assert_eq!(source_text(&diff), old);
        assert_eq!(target_text(&diff), new);
        let stats = stats(&diff);
        assert!(stats.insertions + stats.deletions < 60, "{stats:?}");
        let untouched = "Paragraph 1000 says nothing much.";
        assert!(diff
            .iter()
            .any(|s| s.op == DiffOp::Equal && s.text.contains(untouched)));
    }

    #[test]
    fn budget_refuses_costs_it_cannot_cover() {
        let mut budget = Budget(100);
        assert!(budget.reserve(5, 10));
        assert!(!budget.reserve(10, 10));
        assert!(budget.reserve(10, 5));
        assert!(!budget.reserve(1, 1));
        assert!(budget.reserve(0, usize::MAX));
    }

    // -- properties ----------------------------------------------------------

    proptest! {
        #[test]
        fn diff_rebuilds_both_texts(old in "[ab .\\né]{0,40}", new in "[ab .\\né]{0,40}") {
            let diff = compute_version_diff(Some(&old), &new);
            prop_assert_eq!(source_text(&diff), old);
            prop_assert_eq!(target_text(&diff), new);
        }

        #[test]
        fn diff_spans_are_non_empty_and_coalesced(
            old in "[ab .\\né]{0,40}",
            new in "[ab .\\né]{0,40}"
        ) {
            let diff = compute_version_diff(Some(&old), &new);
            prop_assert!(diff.iter().all(|s| !s.text.is_empty()), "{:?}", diff);
            prop_assert!(diff.windows(2).all(|p| p[0].op != p[1].op), "{:?}", diff);
        }

        #[test]
        fn arbitrary_text_round_trips(old in "\\PC{0,60}", new in "\\PC{0,60}") {
            let diff = compute_version_diff(Some(&old), &new);
            prop_assert_eq!(source_text(&diff), old);
            prop_assert_eq!(target_text(&diff), new);
            prop_assert!(diff.windows(2).all(|p| p[0].op != p[1].op), "{:?}", diff);
        }

        #[test]
        fn identical_texts_diff_to_one_equality(text in "\\PC{0,60}") {
            let diff = compute_version_diff(Some(&text), &text);
            if text.is_empty() {
                prop_assert!(diff.is_empty());
            } else {
                prop_assert_eq!(diff, vec![DiffSpan::new(DiffOp::Equal, text.as_str())]);
            }
        }

        #[test]
        fn diff_is_deterministic(old in "\\PC{0,40}", new in "\\PC{0,40}") {
            prop_assert_eq!(
                compute_version_diff(Some(&old), &new),
                compute_version_diff(Some(&old), &new)
            );
        }
    }

    // -- serialization -------------------------------------------------------

    #[test]
    fn spans_serialize_with_integer_tags() {
        let spans = vec![
            DiffSpan::new(DiffOp::Delete, "a"),
            DiffSpan::new(DiffOp::Equal, "b"),
            DiffSpan::new(DiffOp::Insert, "c"),
        ];
        let json = serde_json::to_value(&spans).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": -1, "text": "a"},
                {"type": 0, "text": "b"},
                {"type": 1, "text": "c"},
            ])
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let result: Result<DiffSpan, _> = serde_json::from_str(r#"{"type": 2, "text": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn stored_diff_parses_back() {
        let raw = r#"[{"type": 1, "text": "Add "}, {"type": 0, "text": "3 ice"}]"#;
        let spans: Vec<DiffSpan> = serde_json::from_str(raw).unwrap();
        assert_eq!(spans[0].op, DiffOp::Insert);
        assert_eq!(spans[1].text, "3 ice");
    }

    // -- metrics -------------------------------------------------------------

    #[test]
    fn stats_count_characters() {
        let diff = compute_version_diff(Some(KAHLUA_V1), KAHLUA_V2);
        assert_eq!(
            stats(&diff),
            DiffStats {
                insertions: 5,
                deletions: 0,
                distance: 5,
            }
        );
    }

    #[test]
    fn levenshtein_counts_substitutions_once() {
        let spans = vec![
            DiffSpan::new(DiffOp::Delete, "abc"),
            DiffSpan::new(DiffOp::Insert, "1234"),
            DiffSpan::new(DiffOp::Equal, "xyz"),
        ];
        assert_eq!(levenshtein(&spans), 4);

        let spans = vec![
            DiffSpan::new(DiffOp::Equal, "xyz"),
            DiffSpan::new(DiffOp::Delete, "abc"),
            DiffSpan::new(DiffOp::Insert, "1234"),
        ];
        assert_eq!(levenshtein(&spans), 4);

        let spans = vec![
            DiffSpan::new(DiffOp::Delete, "abc"),
            DiffSpan::new(DiffOp::Equal, "xyz"),
            DiffSpan::new(DiffOp::Insert, "1234"),
        ];
        assert_eq!(levenshtein(&spans), 7);
    }

    #[test]
    fn op_display_matches_as_str() {
        assert_eq!(DiffOp::Insert.to_string(), "insert");
        assert_eq!(DiffOp::from_code(-1), Some(DiffOp::Delete));
        assert_eq!(DiffOp::from_code(7), None);
    }
}
