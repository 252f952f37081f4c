use midnight_ai::ai::Turn;
use midnight_ai::{
    apply_candidates, commit_to_disk, confirm_and_commit, diff, propose_edits, AiError, Diff,
    Document, EditCandidate, GateError, Model, Outcome, RejectReason, Ui,
};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::PathBuf;
use tempfile::TempDir;

const CONTRACT: &str = "\
import { Ledger } from \"@midnight/ledger\";

export function transfer(ledger: Ledger, amount: number) {
  var balance = ledger.balance;
  if (amount > balance) {
    return;
  }
  ledger.balance = balance - amount;
}
";

fn setup_contract(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Token.ts");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

/// Answers the confirmation with a fixed reply and counts renders.
struct FixedUi {
    answer: Option<bool>,
    rendered: Vec<(usize, usize)>,
    asked: usize,
}

impl FixedUi {
    fn answering(answer: bool) -> Self {
        Self {
            answer: Some(answer),
            rendered: Vec::new(),
            asked: 0,
        }
    }

    fn interrupted() -> Self {
        Self {
            answer: None,
            rendered: Vec::new(),
            asked: 0,
        }
    }
}

impl Ui for FixedUi {
    fn render(&mut self, diff: &Diff) {
        let stats = diff.stats();
        self.rendered.push((stats.added, stats.removed));
    }

    fn confirm(&mut self, _prompt: &str) -> io::Result<bool> {
        self.asked += 1;
        self.answer
            .ok_or_else(|| io::Error::new(io::ErrorKind::Interrupted, "interrupted"))
    }
}

/// Model returning one canned reply.
struct CannedModel {
    reply: String,
    prompts: RefCell<Vec<String>>,
}

impl CannedModel {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl Model for CannedModel {
    fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn chat(&self, _history: &[Turn]) -> Result<String, AiError> {
        Ok(self.reply.clone())
    }
}

#[test]
fn test_descending_edits_commit_on_accept() {
    let (_dir, path) = setup_contract("a\nb\nc\n");
    let original = Document::load(&path).unwrap();
    let result = apply_candidates(
        &original,
        &[
            EditCandidate::new(1, Some(1), "X\n"),
            EditCandidate::new(2, Some(3), "Y\nZ\n"),
        ],
    );

    let mut ui = FixedUi::answering(true);
    let outcome = confirm_and_commit(&original, &result, &mut ui, commit_to_disk).unwrap();

    assert!(outcome.is_committed());
    assert_eq!(ui.asked, 1);
    assert_eq!(ui.rendered, vec![(3, 3)]);
    assert_eq!(fs::read_to_string(&path).unwrap(), "X\nY\nZ\n");
}

#[test]
fn test_growing_edit_below_shrinking_edit() {
    let (_dir, path) = setup_contract("1\n2\n3\n4\n5\n6\n");
    let original = Document::load(&path).unwrap();
    let result = apply_candidates(
        &original,
        &[
            EditCandidate::new(2, Some(3), "two-three\n"),
            EditCandidate::new(5, Some(5), "five\nfive-b\nfive-c\n"),
        ],
    );

    let mut ui = FixedUi::answering(true);
    let outcome = confirm_and_commit(&original, &result, &mut ui, commit_to_disk).unwrap();
    assert!(matches!(outcome, Outcome::Committed { .. }));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "1\ntwo-three\n4\nfive\nfive-b\nfive-c\n6\n"
    );
}

#[test]
fn test_decline_leaves_file_untouched() {
    let (_dir, path) = setup_contract(CONTRACT);
    let original = Document::load(&path).unwrap();
    let result = apply_candidates(
        &original,
        &[EditCandidate::new(4, None, "  const balance = ledger.balance;")
            .with_original("  var balance = ledger.balance;")],
    );
    assert!(result.has_applied());

    let mut ui = FixedUi::answering(false);
    let outcome = confirm_and_commit(&original, &result, &mut ui, commit_to_disk).unwrap();

    assert_eq!(outcome, Outcome::Aborted);
    assert_eq!(ui.rendered.len(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), CONTRACT);
}

#[test]
fn test_interrupted_prompt_is_an_error_and_writes_nothing() {
    let (_dir, path) = setup_contract(CONTRACT);
    let original = Document::load(&path).unwrap();
    let result = apply_candidates(&original, &[EditCandidate::new(4, None, "  let x = 1;")]);

    let mut ui = FixedUi::interrupted();
    let err = confirm_and_commit(&original, &result, &mut ui, commit_to_disk).unwrap_err();

    assert!(matches!(err, GateError::Prompt(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), CONTRACT);
}

#[test]
fn test_out_of_range_only_never_prompts() {
    let (_dir, path) = setup_contract("a\nb\nc\n");
    let original = Document::load(&path).unwrap();
    let result = apply_candidates(&original, &[EditCandidate::new(5, None, "x\n")]);

    let mut ui = FixedUi::answering(true);
    let outcome = confirm_and_commit(&original, &result, &mut ui, commit_to_disk).unwrap();

    match outcome {
        Outcome::NoChanges { rejected } => {
            assert_eq!(rejected.len(), 1);
            assert!(matches!(
                rejected[0].reason,
                RejectReason::OutOfRange {
                    start_line: 5,
                    line_count: 3,
                    ..
                }
            ));
        }
        other => panic!("expected NoChanges, got {other:?}"),
    }
    assert_eq!(ui.asked, 0);
    assert!(ui.rendered.is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
}

#[test]
fn test_ai_proposals_flow_through_pipeline() {
    let reply = r#"Here are the fixes:
```json
[
  {
    "lineNumber": 4,
    "endLineNumber": 4,
    "explanation": "Prefer const for values that are never reassigned.",
    "originalCode": "  var balance = ledger.balance;",
    "suggestedCode": "  const balance = ledger.balance;"
  },
  {
    "lineNumber": 5,
    "endLineNumber": 7,
    "explanation": "Reject overdrafts loudly.",
    "originalCode": "  if (amount > balance) {\n    return;\n  }",
    "suggestedCode": "  if (amount > balance) {\n    throw new Error(\"insufficient balance\");\n  }"
  },
  {
    "lineNumber": 6,
    "endLineNumber": 6,
    "explanation": "Overlaps the fix above.",
    "originalCode": "    return;",
    "suggestedCode": "    return false;"
  },
  {
    "lineNumber": 42,
    "explanation": "Hallucinated line.",
    "originalCode": "",
    "suggestedCode": "oops"
  }
]
```"#;
    let model = CannedModel::new(reply);
    let (_dir, path) = setup_contract(CONTRACT);

    let candidates = propose_edits(&model, CONTRACT, "typescript").unwrap();
    assert_eq!(candidates.len(), 4);
    assert!(model.prompts.borrow()[0].contains("   4 |   var balance = ledger.balance;"));

    let original = Document::load(&path).unwrap();
    let result = apply_candidates(&original, &candidates);
    assert_eq!(result.applied.len(), 2);
    let kinds: Vec<(usize, &str)> = result
        .rejected
        .iter()
        .map(|r| (r.index, r.reason.kind()))
        .collect();
    assert_eq!(kinds, vec![(2, "conflict"), (3, "out of range")]);
    assert!(matches!(result.rejected[0].reason, RejectReason::Conflict { kept_index: 1, .. }));
    assert!(matches!(result.rejected[1].reason, RejectReason::OutOfRange { .. }));

    let mut ui = FixedUi::answering(true);
    let outcome = confirm_and_commit(&original, &result, &mut ui, commit_to_disk).unwrap();
    assert!(matches!(outcome, Outcome::Committed { .. }));

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("  const balance = ledger.balance;\n"));
    assert!(written.contains("throw new Error(\"insufficient balance\");\n"));
    assert!(!written.contains("return false"));
    assert_eq!(written.lines().count(), CONTRACT.lines().count());
}

#[test]
fn test_stale_proposal_is_reported_not_applied() {
    let (_dir, path) = setup_contract(CONTRACT);
    let original = Document::load(&path).unwrap();
    let result = apply_candidates(
        &original,
        &[EditCandidate::new(8, None, "  ledger.balance -= amount;")
            .with_original("  ledger.balance = balance + amount;")],
    );

    assert!(!result.has_applied());
    assert!(matches!(result.rejected[0].reason, RejectReason::Stale { .. }));
    assert!(!diff(&original, &result.document).has_changes());
}

#[test]
fn test_crlf_file_keeps_its_line_endings() {
    let (_dir, path) = setup_contract("let a = 1;\r\nlet b = 2;\r\n");
    let original = Document::load(&path).unwrap();
    let result = apply_candidates(&original, &[EditCandidate::new(2, None, "const b = 2;")]);

    let mut ui = FixedUi::answering(true);
    let outcome = confirm_and_commit(&original, &result, &mut ui, commit_to_disk).unwrap();
    assert!(matches!(outcome, Outcome::Committed { .. }));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "let a = 1;\r\nconst b = 2;\r\n"
    );
}
