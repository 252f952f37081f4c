//! Property tests for the normalize → apply → diff pipeline.

use midnight_ai::{apply, diff, normalize, Document, Edit, EditCandidate};
use proptest::prelude::*;

/// Document text from line payloads; the last line may lack its newline.
fn doc_text(lines: &[String], last_terminated: bool) -> String {
    let mut text = lines.join("\n");
    if last_terminated {
        text.push('\n');
    }
    text
}

fn document_strategy() -> impl Strategy<Value = (Vec<String>, bool)> {
    (prop::collection::vec("[a-d]{0,3}", 1..12), any::<bool>())
}

fn replacement_strategy() -> impl Strategy<Value = String> {
    (prop::collection::vec("[w-z]{0,3}", 0..4), any::<bool>()).prop_map(|(lines, trailing)| {
        if lines.is_empty() {
            return String::new();
        }
        let mut text = lines.join("\n");
        if trailing {
            text.push('\n');
        }
        text
    })
}

fn candidates_strategy(max_line: i64) -> impl Strategy<Value = Vec<EditCandidate>> {
    prop::collection::vec(
        (1..=max_line, 0..3i64, replacement_strategy()),
        0..6,
    )
    .prop_map(move |raw| {
        raw.into_iter()
            .map(|(start, extra, text)| {
                EditCandidate::new(start, Some((start + extra).min(max_line)), &text)
            })
            .collect()
    })
}

fn case_strategy() -> impl Strategy<Value = (String, Vec<EditCandidate>)> {
    document_strategy().prop_flat_map(|(lines, terminated)| {
        let text = doc_text(&lines, terminated);
        let max_line = lines.len() as i64;
        (Just(text), candidates_strategy(max_line))
    })
}

/// Non-empty lines (so line count is exact) plus two overlapping ranges.
fn overlap_strategy() -> impl Strategy<Value = (Vec<String>, i64, i64, i64, i64, bool)> {
    prop::collection::vec("[a-d]{1,3}", 1..12).prop_flat_map(|lines| {
        let n = lines.len() as i64;
        (Just(lines), 1..=n, 0..3i64, 0..3i64, 0..3i64, any::<bool>())
    })
}

/// Reference: apply edits in ascending order, recomputing each position
/// from the running line-count shift.
fn naive_apply(text: &str, edits: &[Edit]) -> String {
    let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
    let mut ascending: Vec<&Edit> = edits.iter().collect();
    ascending.sort_by_key(|e| e.start_line);

    let mut shift: isize = 0;
    for edit in ascending {
        let start = (edit.start_line as isize - 1 + shift) as usize;
        let end = (edit.end_line as isize + shift) as usize;

        let mut replacement: Vec<String> = edit
            .replacement
            .split_inclusive('\n')
            .map(str::to_string)
            .collect();
        if let Some(last) = replacement.last_mut() {
            if !last.ends_with('\n') && lines[end - 1].ends_with('\n') {
                last.push('\n');
            }
        }

        shift += replacement.len() as isize - (end - start) as isize;
        lines.splice(start..end, replacement);
    }
    lines.concat()
}

proptest! {
    #[test]
    fn descending_matches_naive_reference((text, candidates) in case_strategy()) {
        let doc = Document::from_text("t.ts", &text);
        let normalized = normalize(&candidates, &doc);
        let result = apply(&doc, &normalized.edits);
        prop_assert_eq!(
            result.document.to_text(),
            naive_apply(&text, normalized.edits.as_slice())
        );
    }

    #[test]
    fn diff_round_trips((text, candidates) in case_strategy()) {
        let doc = Document::from_text("t.ts", &text);
        let normalized = normalize(&candidates, &doc);
        let patched = apply(&doc, &normalized.edits).document;
        let d = diff(&doc, &patched);
        prop_assert_eq!(d.apply_to(&doc).unwrap(), patched);
    }

    #[test]
    fn normalized_set_is_disjoint_and_descending((text, candidates) in case_strategy()) {
        let doc = Document::from_text("t.ts", &text);
        let normalized = normalize(&candidates, &doc);
        for pair in normalized.edits.as_slice().windows(2) {
            prop_assert!(pair[1].end_line < pair[0].start_line);
        }
        prop_assert_eq!(
            normalized.edits.len() + normalized.rejected.len(),
            candidates.len()
        );
    }

    #[test]
    fn untouched_unterminated_last_line_survives(
        (lines, _) in document_strategy(),
        candidates in candidates_strategy(12),
    ) {
        prop_assume!(lines.len() >= 2 && !lines.last().unwrap().is_empty());
        let text = doc_text(&lines, false);
        let doc = Document::from_text("t.ts", &text);
        let last = doc.line_count();

        // Keep only edits that stay clear of the last line
        let clear: Vec<EditCandidate> = candidates
            .into_iter()
            .filter(|c| c.end_line_number.unwrap_or(0) < last as i64)
            .collect();

        let patched = apply(&doc, &normalize(&clear, &doc).edits).document;
        let final_line = patched.lines().last().unwrap();
        prop_assert!(!final_line.is_terminated());
        prop_assert_eq!(&final_line.text, lines.last().unwrap());
    }

    #[test]
    fn replacing_unterminated_last_line_adds_no_terminator(
        (lines, _) in document_strategy(),
        replacement in "[w-z]{1,3}",
    ) {
        prop_assume!(!lines.last().unwrap().is_empty());
        let text = doc_text(&lines, false);
        let doc = Document::from_text("t.ts", &text);
        let last = doc.line_count() as i64;
        let candidate = EditCandidate::new(last, None, &replacement);
        let patched = apply(&doc, &normalize(&[candidate], &doc).edits).document;
        prop_assert!(!patched.to_text().ends_with('\n'));
        prop_assert!(patched.to_text().ends_with(replacement.as_str()));
    }

    #[test]
    fn overlapping_pair_keeps_lower_numbered(
        (lines, a, len_a, step, len_b, forward) in overlap_strategy(),
    ) {
        let n = lines.len() as i64;
        let doc = Document::from_text("t.ts", &doc_text(&lines, true));
        let a_end = (a + len_a).min(n);
        let (b, b_end) = if forward {
            let b = (a + step).min(a_end);
            (b, (b + len_b).min(n))
        } else {
            let b = (a - step).max(1);
            (b, (b + len_b).max(a).min(n))
        };

        let candidates = vec![
            EditCandidate::new(a, Some(a_end), "first\n"),
            EditCandidate::new(b, Some(b_end), "second\n"),
        ];
        let normalized = normalize(&candidates, &doc);
        prop_assert_eq!(normalized.edits.len(), 1);
        prop_assert_eq!(normalized.rejected.len(), 1);

        let kept = &normalized.edits.as_slice()[0];
        let expected_index = if b < a { 1 } else { 0 };
        prop_assert_eq!(kept.index, expected_index);
    }
}
