//! Post-processing passes over a raw diff.
//!
//! All passes work on characters rather than bytes so multi-byte content is
//! never split, and none of them changes the texts a diff reconstructs.

use super::{DiffOp, DiffSpan};

/// Working representation: operation plus the span's characters.
type Chunk = (DiffOp, Vec<char>);

fn to_chunks(spans: Vec<DiffSpan>) -> Vec<Chunk> {
    spans
        .into_iter()
        .map(|s| (s.op, s.text.chars().collect()))
        .collect()
}

fn from_chunks(chunks: Vec<Chunk>) -> Vec<DiffSpan> {
    chunks
        .into_iter()
        .map(|(op, text)| DiffSpan {
            op,
            text: text.into_iter().collect(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public passes
// ---------------------------------------------------------------------------

/// Merge adjacent spans of the same operation, factor common prefixes and
/// suffixes out of delete/insert runs, and slide single edits over
/// neighbouring equalities where that removes an equality.
pub fn cleanup_merge(spans: Vec<DiffSpan>) -> Vec<DiffSpan> {
    let mut chunks = to_chunks(spans);
    merge(&mut chunks);
    from_chunks(chunks)
}

/// Reduce the number of edits by eliminating semantically trivial
/// equalities, then align the remaining edits on word boundaries and pull
/// overlaps between deletions and insertions out into equalities.
pub fn cleanup_semantic(spans: Vec<DiffSpan>) -> Vec<DiffSpan> {
    let mut chunks = to_chunks(spans);
    semantic(&mut chunks);
    from_chunks(chunks)
}

/// Slide single edits surrounded by equalities sideways so that they start
/// and end on the most natural boundary (blank line, line break, sentence
/// end, whitespace, punctuation).
pub fn cleanup_semantic_lossless(spans: Vec<DiffSpan>) -> Vec<DiffSpan> {
    let mut chunks = to_chunks(spans);
    if semantic_lossless(&mut chunks) {
        merge(&mut chunks);
    }
    from_chunks(chunks)
}

// ---------------------------------------------------------------------------
// Character helpers
// ---------------------------------------------------------------------------

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Length of the longest suffix of `a` that is also a prefix of `b`.
///
/// Runs `a` through the KMP automaton of `b`, so it is linear in both.
fn common_overlap(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut failure = vec![0; b.len()];
    let mut k = 0;
    for i in 1..b.len() {
        while k > 0 && b[i] != b[k] {
            k = failure[k - 1];
        }
        if b[i] == b[k] {
            k += 1;
        }
        failure[i] = k;
    }

    let mut matched = 0;
    for &c in a {
        while matched > 0 && (matched == b.len() || c != b[matched]) {
            matched = failure[matched - 1];
        }
        if c == b[matched] {
            matched += 1;
        }
    }
    matched
}

fn concat(a: &[char], b: &[char]) -> Vec<char> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

fn ends_with_blank_line(text: &[char]) -> bool {
    text.ends_with(&['\n', '\n']) || text.ends_with(&['\n', '\r', '\n'])
}

fn starts_with_blank_line(text: &[char]) -> bool {
    text.starts_with(&['\n', '\n'])
        || text.starts_with(&['\n', '\r', '\n'])
        || text.starts_with(&['\r', '\n', '\n'])
        || text.starts_with(&['\r', '\n', '\r', '\n'])
}

/// Score how natural the boundary between `one` and `two` is (0..=6).
fn boundary_score(one: &[char], two: &[char]) -> u8 {
    let (Some(&c1), Some(&c2)) = (one.last(), two.first()) else {
        // Edges are the best possible boundaries.
        return 6;
    };

    let non_alnum1 = !c1.is_alphanumeric();
    let non_alnum2 = !c2.is_alphanumeric();
    let whitespace1 = non_alnum1 && c1.is_whitespace();
    let whitespace2 = non_alnum2 && c2.is_whitespace();
    let line_break1 = whitespace1 && (c1 == '\r' || c1 == '\n');
    let line_break2 = whitespace2 && (c2 == '\r' || c2 == '\n');
    let blank_line1 = line_break1 && ends_with_blank_line(one);
    let blank_line2 = line_break2 && starts_with_blank_line(two);

    if blank_line1 || blank_line2 {
        5
    } else if line_break1 || line_break2 {
        4
    } else if non_alnum1 && !whitespace1 && whitespace2 {
        // End of sentence.
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

fn merge(diffs: &mut Vec<Chunk>) {
    // Sentinel equality flushes the final run of edits.
    diffs.push((DiffOp::Equal, Vec::new()));

    let mut pointer = 0;
    let mut count_delete = 0;
    let mut count_insert = 0;
    let mut text_delete: Vec<char> = Vec::new();
    let mut text_insert: Vec<char> = Vec::new();

    while pointer < diffs.len() {
        match diffs[pointer].0 {
            DiffOp::Insert => {
                count_insert += 1;
                text_insert.extend_from_slice(&diffs[pointer].1);
                pointer += 1;
            }
            DiffOp::Delete => {
                count_delete += 1;
                text_delete.extend_from_slice(&diffs[pointer].1);
                pointer += 1;
            }
            DiffOp::Equal => {
                if count_delete + count_insert > 1 {
                    if count_delete != 0 && count_insert != 0 {
                        let prefix = common_prefix(&text_insert, &text_delete);
                        if prefix != 0 {
                            let run_start = pointer - count_delete - count_insert;
                            let common: Vec<char> = text_insert[..prefix].to_vec();
                            if run_start > 0 && diffs[run_start - 1].0 == DiffOp::Equal {
                                diffs[run_start - 1].1.extend(common);
                            } else {
                                diffs.insert(0, (DiffOp::Equal, common));
                                pointer += 1;
                            }
                            text_insert.drain(..prefix);
                            text_delete.drain(..prefix);
                        }

                        let suffix = common_suffix(&text_insert, &text_delete);
                        if suffix != 0 {
                            let common = &text_insert[text_insert.len() - suffix..];
                            diffs[pointer].1 = concat(common, &diffs[pointer].1);
                            text_insert.truncate(text_insert.len() - suffix);
                            text_delete.truncate(text_delete.len() - suffix);
                        }
                    }

                    pointer -= count_delete + count_insert;
                    diffs.drain(pointer..pointer + count_delete + count_insert);
                    if !text_delete.is_empty() {
                        diffs.insert(pointer, (DiffOp::Delete, std::mem::take(&mut text_delete)));
                        pointer += 1;
                    }
                    if !text_insert.is_empty() {
                        diffs.insert(pointer, (DiffOp::Insert, std::mem::take(&mut text_insert)));
                        pointer += 1;
                    }
                    pointer += 1;
                } else if pointer != 0 && diffs[pointer - 1].0 == DiffOp::Equal {
                    let (_, text) = diffs.remove(pointer);
                    diffs[pointer - 1].1.extend(text);
                } else {
                    pointer += 1;
                }
                count_insert = 0;
                count_delete = 0;
                text_delete.clear();
                text_insert.clear();
            }
        }
    }

    if diffs.last().is_some_and(|(_, text)| text.is_empty()) {
        diffs.pop();
    }

    // Second pass: single edits surrounded by equalities which can be
    // shifted sideways to eliminate an equality, e.g. A<ins>BA</ins>C ->
    // <ins>AB</ins>AC.
    let mut changes = false;
    let mut pointer = 1;
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].0 == DiffOp::Equal && diffs[pointer + 1].0 == DiffOp::Equal {
            let prev = diffs[pointer - 1].1.clone();
            let current = diffs[pointer].1.clone();
            let next = diffs[pointer + 1].1.clone();

            if current.ends_with(&prev) {
                diffs[pointer].1 = concat(&prev, &current[..current.len() - prev.len()]);
                diffs[pointer + 1].1 = concat(&prev, &next);
                diffs.remove(pointer - 1);
                changes = true;
            } else if current.starts_with(&next) {
                diffs[pointer - 1].1.extend_from_slice(&next);
                diffs[pointer].1 = concat(&current[next.len()..], &next);
                diffs.remove(pointer + 1);
                changes = true;
            }
        }
        pointer += 1;
    }

    if changes {
        merge(diffs);
    }
}

// ---------------------------------------------------------------------------
// Semantic cleanup
// ---------------------------------------------------------------------------

fn semantic(diffs: &mut Vec<Chunk>) {
    let mut changes = false;
    // Indices of equalities seen so far.
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;
    let mut pointer: usize = 0;
    // Edit lengths before and after the last equality.
    let mut insertions_before = 0;
    let mut deletions_before = 0;
    let mut insertions_after = 0;
    let mut deletions_after = 0;

    while pointer < diffs.len() {
        if diffs[pointer].0 == DiffOp::Equal {
            equalities.push(pointer);
            insertions_before = insertions_after;
            deletions_before = deletions_after;
            insertions_after = 0;
            deletions_after = 0;
            last_equality = Some(diffs[pointer].1.clone());
            pointer += 1;
            continue;
        }

        if diffs[pointer].0 == DiffOp::Insert {
            insertions_after += diffs[pointer].1.len();
        } else {
            deletions_after += diffs[pointer].1.len();
        }

        let eliminate = match &last_equality {
            Some(eq) => {
                !eq.is_empty()
                    && eq.len() <= insertions_before.max(deletions_before)
                    && eq.len() <= insertions_after.max(deletions_after)
            }
            None => false,
        };

        if eliminate {
            let Some(index) = equalities.pop() else {
                pointer += 1;
                continue;
            };
            let text = last_equality.take().unwrap_or_default();
            // Replace the equality with a delete + insert of the same text.
            diffs.insert(index, (DiffOp::Delete, text));
            diffs[index + 1].0 = DiffOp::Insert;
            // The previous equality needs to be re-evaluated too.
            equalities.pop();
            pointer = equalities.last().map_or(0, |&i| i + 1);
            insertions_before = 0;
            deletions_before = 0;
            insertions_after = 0;
            deletions_after = 0;
            changes = true;
            continue;
        }

        pointer += 1;
    }

    if changes {
        merge(diffs);
    }
    // Dropping an emptied equality can leave two edits of the same kind side
    // by side.
    if semantic_lossless(diffs) {
        merge(diffs);
    }
    extract_overlaps(diffs);
}

/// Turn overlapping delete/insert pairs into an equality flanked by the
/// non-overlapping parts, e.g. `<del>abcxxx</del><ins>xxxdef</ins>` ->
/// `<del>abc</del>xxx<ins>def</ins>`. Only done when the overlap is at
/// least half of either side.
fn extract_overlaps(diffs: &mut Vec<Chunk>) {
    let mut pointer = 1;
    while pointer < diffs.len() {
        if diffs[pointer - 1].0 == DiffOp::Delete && diffs[pointer].0 == DiffOp::Insert {
            let deletion = diffs[pointer - 1].1.clone();
            let insertion = diffs[pointer].1.clone();
            let overlap1 = common_overlap(&deletion, &insertion);
            let overlap2 = common_overlap(&insertion, &deletion);

            if overlap1 >= overlap2 {
                if overlap1 * 2 >= deletion.len() || overlap1 * 2 >= insertion.len() {
                    diffs.insert(pointer, (DiffOp::Equal, insertion[..overlap1].to_vec()));
                    diffs[pointer - 1].1 = deletion[..deletion.len() - overlap1].to_vec();
                    diffs[pointer + 1].1 = insertion[overlap1..].to_vec();
                    pointer += 1;
                }
            } else if overlap2 * 2 >= deletion.len() || overlap2 * 2 >= insertion.len() {
                // Reverse overlap: the insertion's tail matches the deletion's head.
                diffs.insert(pointer, (DiffOp::Equal, deletion[..overlap2].to_vec()));
                diffs[pointer - 1] = (
                    DiffOp::Insert,
                    insertion[..insertion.len() - overlap2].to_vec(),
                );
                diffs[pointer + 1] = (DiffOp::Delete, deletion[overlap2..].to_vec());
                pointer += 1;
            }
            pointer += 1;
        }
        pointer += 1;
    }
}

/// Returns `true` if an equality was shifted away entirely.
fn semantic_lossless(diffs: &mut Vec<Chunk>) -> bool {
    let mut removed = false;
    let mut pointer = 1;
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].0 == DiffOp::Equal && diffs[pointer + 1].0 == DiffOp::Equal {
            let mut equality1 = diffs[pointer - 1].1.clone();
            let mut edit = diffs[pointer].1.clone();
            let mut equality2 = diffs[pointer + 1].1.clone();

            // Shift the edit as far left as possible.
            let offset = common_suffix(&equality1, &edit);
            if offset > 0 {
                let common = edit[edit.len() - offset..].to_vec();
                equality1.truncate(equality1.len() - offset);
                edit = concat(&common, &edit[..edit.len() - offset]);
                equality2 = concat(&common, &equality2);
            }

            // Step right one character at a time, keeping the best fit.
            let mut best_equality1 = equality1.clone();
            let mut best_edit = edit.clone();
            let mut best_equality2 = equality2.clone();
            let mut best_score =
                boundary_score(&equality1, &edit) + boundary_score(&edit, &equality2);
            while !edit.is_empty() && !equality2.is_empty() && edit[0] == equality2[0] {
                let c = edit.remove(0);
                equality1.push(c);
                edit.push(equality2.remove(0));
                let score = boundary_score(&equality1, &edit) + boundary_score(&edit, &equality2);
                // `>=` prefers the rightmost of equally good positions.
                if score >= best_score {
                    best_score = score;
                    best_equality1.clone_from(&equality1);
                    best_edit.clone_from(&edit);
                    best_equality2.clone_from(&equality2);
                }
            }

            if diffs[pointer - 1].1 != best_equality1 {
                if best_equality1.is_empty() {
                    diffs.remove(pointer - 1);
                    pointer -= 1;
                    removed = true;
                } else {
                    diffs[pointer - 1].1 = best_equality1;
                }
                diffs[pointer].1 = best_edit;
                if best_equality2.is_empty() {
                    diffs.remove(pointer + 1);
                    // Revisit the edit now that its right neighbour moved.
                    pointer = pointer.saturating_sub(1);
                    removed = true;
                } else {
                    diffs[pointer + 1].1 = best_equality2;
                }
            }
        }
        pointer += 1;
    }
    removed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
