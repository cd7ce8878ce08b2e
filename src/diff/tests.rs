//! Tests for diff parsing, patch application and file transactions.

use super::*;
use crate::config::{DiffSettings, MatchPolicy};
use crate::context::WorkspaceContext;
use crate::error::KoduError;
use crate::events::{EventAction, read_events};
use crate::git::GitHandler;
use crate::test_support::{create_test_repo, write_file};
use crate::tools::FileEditAction;
use tempfile::TempDir;

const SOURCE: &str = "use std::fmt;\n\nfn one() {\n    1\n}\n\nfn two() {\n    2\n}\n";

fn block(head: &str, updated: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n",
        HEAD_MARKER, head, SEPARATOR_MARKER, updated, UPDATED_MARKER
    )
}

fn editor(temp_dir: &TempDir) -> FileEditor {
    FileEditor::open(WorkspaceContext::at(temp_dir.path()), DiffSettings::default()).unwrap()
}

fn applied(outcome: EditOutcome) -> EditReport {
    match outcome {
        EditOutcome::Applied(report) => report,
        EditOutcome::Mismatch(failure) => panic!("unexpected mismatch: {}", failure.report()),
    }
}

fn edit(diff: String) -> FileEditAction {
    FileEditAction::Edit {
        diff,
        commit_message: "fix: change".to_string(),
    }
}

fn whole_write(content: &str) -> FileEditAction {
    FileEditAction::WholeWrite {
        content: content.to_string(),
        commit_message: "feat: write".to_string(),
    }
}

// ============================================================================
// Block parsing
// ============================================================================

#[test]
fn test_parse_blocks_in_order() {
    let diff = format!(
        "{}{}",
        block("fn one() {\n    1\n}", "fn one() {\n    10\n}"),
        block("fn two() {\n    2\n}", "")
    );
    let blocks = parse_diff_blocks(&diff, MAX_DIFF_BLOCKS).unwrap();

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].head, "fn one() {\n    1\n}");
    assert_eq!(blocks[0].updated, "fn one() {\n    10\n}");
    assert_eq!(blocks[1].updated, "");
}

#[test]
fn test_parse_markers_tolerate_surrounding_whitespace() {
    let diff = "  <<<<<<< HEAD  \r\na\r\n=======\t\r\nb\r\n >>>>>>> updated\r\n";
    let blocks = parse_diff_blocks(diff, MAX_DIFF_BLOCKS).unwrap();
    assert_eq!(blocks[0].head, "a");
    assert_eq!(blocks[0].updated, "b");
}

#[test]
fn test_parse_rejects_malformed_payloads() {
    let cases = [
        ("just some text", "no '<<<<<<< HEAD' blocks"),
        ("<<<<<<< HEAD\na\n>>>>>>> updated\n", "missing '======='"),
        ("<<<<<<< HEAD\na\n=======\nb\n", "missing '>>>>>>> updated'"),
        ("<<<<<<< HEAD\na\n", "missing '======='"),
        ("=======\n", "outside a block"),
    ];
    for (diff, expected) in cases {
        let err = parse_diff_blocks(diff, MAX_DIFF_BLOCKS).unwrap_err();
        assert!(matches!(err, KoduError::PatchFailed(_)));
        assert!(err.to_string().contains(expected), "{}: {}", diff, err);
    }
}

#[test]
fn test_parse_rejects_too_many_blocks() {
    let diff = (0..6).map(|i| block(&i.to_string(), "x")).collect::<String>();
    let err = parse_diff_blocks(&diff, MAX_DIFF_BLOCKS).unwrap_err();
    assert!(err.to_string().contains("at most 5"));

    let diff = (0..3).map(|i| block(&i.to_string(), "x")).collect::<String>();
    assert!(parse_diff_blocks(&diff, 2).is_err());
}

// ============================================================================
// Patch application
// ============================================================================

#[test]
fn test_apply_equals_sequential_substitution() {
    let blocks = vec![
        DiffBlock {
            head: "fn one() {\n    1\n}".to_string(),
            updated: "fn one() {\n    11\n}".to_string(),
        },
        DiffBlock {
            head: "fn two() {\n    2\n}".to_string(),
            updated: "fn two() {\n    22\n}".to_string(),
        },
    ];
    let patched = apply_blocks(SOURCE, &blocks, &DiffSettings::default()).unwrap();

    let expected = SOURCE
        .replacen(&blocks[0].head, &blocks[0].updated, 1)
        .replacen(&blocks[1].head, &blocks[1].updated, 1);
    assert_eq!(patched.content, expected);
    assert_eq!(patched.lines, vec![3, 7]);
}

#[test]
fn test_apply_one_space_difference_fails_whole_transaction() {
    let blocks = vec![
        DiffBlock {
            head: "fn one() {\n    1\n}".to_string(),
            updated: "fn one() {\n    11\n}".to_string(),
        },
        DiffBlock {
            head: "fn two() {\n     2\n}".to_string(),
            updated: "fn two() {\n    22\n}".to_string(),
        },
    ];
    let failure = apply_blocks(SOURCE, &blocks, &DiffSettings::default()).unwrap_err();

    assert_eq!(failure.block, 2);
    assert_eq!(failure.total, 2);
    assert_eq!(failure.reason, MismatchReason::NotFound);
    let nearest = failure.nearest.as_ref().unwrap();
    assert_eq!(nearest.line, 7);
    assert_eq!(nearest.text, "fn two() {\n    2\n}");

    let report = failure.report();
    assert!(report.contains("block 2 of 2"));
    assert!(report.contains("No changes were applied"));
    assert!(report.contains("line 7"));
}

#[test]
fn test_apply_blocks_out_of_order_fail() {
    let blocks = vec![
        DiffBlock {
            head: "fn two() {".to_string(),
            updated: "fn deux() {".to_string(),
        },
        DiffBlock {
            head: "fn one() {".to_string(),
            updated: "fn un() {".to_string(),
        },
    ];
    let failure = apply_blocks(SOURCE, &blocks, &DiffSettings::default()).unwrap_err();
    assert_eq!(failure.block, 2);
}

#[test]
fn test_apply_ambiguous_head_under_unique_policy() {
    let content = "x = 1\ny = 2\nx = 1\n";
    let blocks = vec![DiffBlock {
        head: "x = 1".to_string(),
        updated: "x = 3".to_string(),
    }];

    let failure = apply_blocks(content, &blocks, &DiffSettings::default()).unwrap_err();
    assert_eq!(failure.reason, MismatchReason::Ambiguous { occurrences: 2 });
    assert!(failure.to_string().contains("ambiguous: 2 occurrences"));

    let first_match = DiffSettings {
        match_policy: MatchPolicy::FirstMatch,
        ..DiffSettings::default()
    };
    let patched = apply_blocks(content, &blocks, &first_match).unwrap();
    assert_eq!(patched.content, "x = 3\ny = 2\nx = 1\n");
}

#[test]
fn test_apply_empty_head_fails() {
    let blocks = vec![DiffBlock {
        head: "  ".to_string(),
        updated: "x".to_string(),
    }];
    let failure = apply_blocks("abc", &blocks, &DiffSettings::default()).unwrap_err();
    assert_eq!(failure.reason, MismatchReason::EmptyHead);
}

#[test]
fn test_apply_deleting_lines_takes_line_break() {
    let blocks = vec![DiffBlock {
        head: "b".to_string(),
        updated: String::new(),
    }];
    let patched = apply_blocks("a\nb\nc\n", &blocks, &DiffSettings::default()).unwrap();
    assert_eq!(patched.content, "a\nc\n");
}

#[test]
fn test_apply_trailing_whitespace_tolerance() {
    let content = "fn one() {  \n    1\n}\n";
    let blocks = vec![DiffBlock {
        head: "fn one() {\n    1\n}".to_string(),
        updated: "fn one() {\n    2\n}".to_string(),
    }];

    assert!(apply_blocks(content, &blocks, &DiffSettings::default()).is_err());

    let tolerant = DiffSettings {
        tolerate_trailing_whitespace: true,
        ..DiffSettings::default()
    };
    let patched = apply_blocks(content, &blocks, &tolerant).unwrap();
    assert_eq!(patched.content, "fn one() {\n    2\n}\n");
}

#[test]
fn test_apply_overlapping_heads_are_ambiguous() {
    let blocks = vec![DiffBlock {
        head: "}\n}".to_string(),
        updated: "X".to_string(),
    }];
    let failure = apply_blocks("}\n}\n}\n", &blocks, &DiffSettings::default()).unwrap_err();
    assert_eq!(failure.reason, MismatchReason::Ambiguous { occurrences: 2 });
}

#[test]
fn test_parse_keeps_crlf_line_endings() {
    let diff = "<<<<<<< HEAD\r\nfn one() {\r\n    1\r\n}\r\n=======\r\nfn one() {\r\n    2\r\n}\r\n>>>>>>> updated\r\n";
    let blocks = parse_diff_blocks(diff, MAX_DIFF_BLOCKS).unwrap();
    assert_eq!(blocks[0].head, "fn one() {\r\n    1\r\n}");
    assert_eq!(blocks[0].updated, "fn one() {\r\n    2\r\n}");
}

#[test]
fn test_apply_crlf_file_with_either_line_ending() {
    let content = "fn one() {\r\n    1\r\n}\r\n";
    for (head, updated) in [
        ("fn one() {\r\n    1\r\n}", "fn one() {\r\n    2\r\n}"),
        ("fn one() {\n    1\n}", "fn one() {\n    2\n}"),
    ] {
        let blocks = vec![DiffBlock {
            head: head.to_string(),
            updated: updated.to_string(),
        }];
        let patched = apply_blocks(content, &blocks, &DiffSettings::default()).unwrap();
        assert_eq!(patched.content, "fn one() {\r\n    2\r\n}\r\n");
        assert_eq!(patched.lines, vec![1]);
    }
}

#[test]
fn test_edit_crlf_file_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "win.rs", "fn one() {\r\n    1\r\n}\r\n");
    let mut editor = editor(&temp_dir);

    let diff = "<<<<<<< HEAD\r\n    1\r\n=======\r\n    3\r\n>>>>>>> updated\r\n".to_string();
    applied(editor.apply("win.rs", &edit(diff)).unwrap());
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("win.rs")).unwrap(),
        "fn one() {\r\n    3\r\n}\r\n"
    );
}

// ============================================================================
// File transactions
// ============================================================================

#[test]
fn test_edit_applies_and_records_version() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "src/lib.rs", SOURCE);
    let mut editor = editor(&temp_dir);

    let report = applied(
        editor
            .apply(
                "src/lib.rs",
                &edit(block("fn one() {\n    1\n}", "fn one() {\n    100\n}")),
            )
            .unwrap(),
    );

    assert_eq!(report.mode, "edit");
    assert_eq!(report.version, Some(1));
    let content = std::fs::read_to_string(temp_dir.path().join("src/lib.rs")).unwrap();
    assert!(content.contains("    100\n"));
    assert_eq!(editor.history().entries("src/lib.rs")[0].mode, EditMode::Edit);
}

#[test]
fn test_edit_mismatch_leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(temp_dir.path(), "src/lib.rs", SOURCE);
    let mut editor = editor(&temp_dir);

    let diff = format!(
        "{}{}",
        block("fn one() {\n    1\n}", "fn one() {\n    100\n}"),
        block("fn two()  {", "fn two() {")
    );
    let outcome = editor.apply("src/lib.rs", &edit(diff)).unwrap();

    let EditOutcome::Mismatch(failure) = outcome else {
        panic!("expected a mismatch");
    };
    assert_eq!(failure.block, 2);
    assert_eq!(std::fs::read_to_string(path).unwrap(), SOURCE);
    assert!(editor.history().entries("src/lib.rs").is_empty());

    let ctx = WorkspaceContext::at(temp_dir.path());
    let events = read_events(&ctx).unwrap();
    assert_eq!(events.last().unwrap().action, EventAction::PatchFailed);
}

#[test]
fn test_edit_missing_file_is_user_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut editor = editor(&temp_dir);
    let err = editor
        .apply("nope.rs", &edit(block("a", "b")))
        .unwrap_err();
    assert!(matches!(err, KoduError::UserError(_)));
}

#[test]
fn test_whole_write_then_rollback_restores_prior_content() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(temp_dir.path(), "notes.txt", "original\n");
    let mut editor = editor(&temp_dir);

    applied(editor.apply("notes.txt", &whole_write("replaced\n")).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "replaced\n");

    let report = applied(editor.apply("notes.txt", &FileEditAction::Rollback).unwrap());
    assert_eq!(report.version, Some(2));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "original\n");
}

#[test]
fn test_rollback_of_created_file_deletes_it() {
    let temp_dir = TempDir::new().unwrap();
    let mut editor = editor(&temp_dir);

    let report = applied(editor.apply("src/new.rs", &whole_write("pub fn f() {}\n")).unwrap());
    assert!(report.summary.starts_with("Created"));
    assert!(temp_dir.path().join("src/new.rs").exists());

    applied(editor.apply("src/new.rs", &FileEditAction::Rollback).unwrap());
    assert!(!temp_dir.path().join("src/new.rs").exists());
}

#[test]
fn test_rollback_of_rollback_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "a.txt", "one\n");
    let mut editor = editor(&temp_dir);

    applied(editor.apply("a.txt", &whole_write("two\n")).unwrap());
    applied(editor.apply("a.txt", &FileEditAction::Rollback).unwrap());

    let err = editor.apply("a.txt", &FileEditAction::Rollback).unwrap_err();
    assert!(matches!(err, KoduError::UserError(_)));
    assert!(err.to_string().contains("only one level of undo"));
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(),
        "one\n"
    );
}

#[test]
fn test_rollback_without_history_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "a.txt", "one\n");
    let mut editor = editor(&temp_dir);

    let err = editor.apply("a.txt", &FileEditAction::Rollback).unwrap_err();
    assert!(matches!(err, KoduError::UserError(_)));
    assert!(err.to_string().contains("no recorded changes"));
}

#[test]
fn test_history_persists_and_lists_versions() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut editor = editor(&temp_dir);
        applied(editor.apply("a.txt", &whole_write("one\n")).unwrap());
        applied(editor.apply("./a.txt", &whole_write("two\n")).unwrap());
    }

    let mut reopened = editor(&temp_dir);
    let report = applied(reopened.apply("a.txt", &FileEditAction::ListVersions).unwrap());
    assert_eq!(report.versions.len(), 2);
    assert_eq!(report.versions[1].version, 2);
    assert_eq!(report.versions[1].previous.as_deref(), Some("one\n"));
    assert!(report.response_text().contains("v2"));

    applied(reopened.apply("a.txt", &FileEditAction::Rollback).unwrap());
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(),
        "one\n"
    );
}

#[test]
fn test_history_keeps_only_latest_pre_image() {
    let temp_dir = TempDir::new().unwrap();
    let mut editor = editor(&temp_dir);
    applied(editor.apply("a.txt", &whole_write("first body\n")).unwrap());
    applied(editor.apply("a.txt", &whole_write("second body\n")).unwrap());
    applied(editor.apply("a.txt", &whole_write("third body\n")).unwrap());

    let entries = editor.history().entries("a.txt");
    assert!(entries[0].created);
    assert!(entries[..2].iter().all(|e| e.previous.is_none()));
    assert_eq!(entries[2].previous.as_deref(), Some("second body\n"));

    let stored = std::fs::read_to_string(temp_dir.path().join(".kodu/versions.json")).unwrap();
    assert!(!stored.contains("first body"));
    assert!(stored.contains("second body"));
}

#[test]
fn test_rollback_of_created_file_after_reload() {
    let temp_dir = TempDir::new().unwrap();
    applied(editor(&temp_dir).apply("fresh.txt", &whole_write("hi\n")).unwrap());

    let mut reopened = editor(&temp_dir);
    applied(reopened.apply("fresh.txt", &FileEditAction::Rollback).unwrap());
    assert!(!temp_dir.path().join("fresh.txt").exists());
}

#[test]
fn test_paths_outside_workspace_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut editor = editor(&temp_dir);
    let err = editor.apply("../escape.txt", &whole_write("x")).unwrap_err();
    assert!(matches!(err, KoduError::UserError(_)));
}

#[test]
fn test_transactions_are_committed_when_vcs_attached() {
    let temp_dir = create_test_repo();
    let ctx = WorkspaceContext::at(temp_dir.path());
    let mut editor = FileEditor::open(ctx, DiffSettings::default())
        .unwrap()
        .with_vcs(Box::new(GitHandler::new(temp_dir.path())), false);

    let report = applied(editor.apply("src/app.rs", &whole_write("fn app() {}\n")).unwrap());
    let commit = report.commit.clone().unwrap();
    assert_eq!(commit.branch, "main");
    assert_eq!(commit.commit_hash.len(), 40);
    assert!(report.response_text().contains("<git_commit_info>"));

    let entry = &editor.history().entries("src/app.rs")[0];
    assert_eq!(entry.commit_hash.as_deref(), Some(commit.commit_hash.as_str()));

    let rollback = applied(editor.apply("src/app.rs", &FileEditAction::Rollback).unwrap());
    assert!(rollback.commit.is_some());
    assert_eq!(
        editor.history().last("src/app.rs").unwrap().commit_message.as_deref(),
        Some("revert: src/app.rs")
    );
}
