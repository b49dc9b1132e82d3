//! Closure edit log: hash chain integrity
//!
//! GREEN when:
//! - Edits of a closure verify as a valid chain.
//! - Mutating recorded changes in the file is detected at that line.
//! - Deleting a line is detected at the line after the gap.
//! - An empty log is valid with 0 events.
//! - Reopening a log chains new edits onto the existing tail.
//! - A tampered log is refused before anything is appended.
//! - An empty diff writes nothing.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use till_audit::{verify_log, verify_log_str, EditLog, VerifyResult, CLOSURE_EDITED};
use till_closure::{build_at, diff, BuildOptions, CanonicalClosure, ClosureDiff, Money, RawClosureInput};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

fn closure(pix: &str) -> CanonicalClosure {
    build_at(
        &RawClosureInput::from_pairs([("pix", pix), ("obs", "ok")]),
        &BuildOptions::default(),
        now(),
    )
    .unwrap()
}

/// Diff from an all-zero pix to `pix` units.
fn pix_edit(pix: i64) -> ClosureDiff {
    let before = closure("0");
    let after = before
        .with_changes(|b| b.pix_amount = Money::from_cents(pix * 100))
        .unwrap();
    diff(&before, &after)
}

fn write_edits(path: &std::path::Path, n: i64) {
    let mut log = EditLog::open(path, true).unwrap();
    for i in 1..=n {
        log.record_edit_at("closure-42", &pix_edit(i), now()).unwrap();
    }
}

fn rewrite_line(path: &std::path::Path, index: usize, edit: impl FnOnce(&mut serde_json::Value)) {
    let content = std::fs::read_to_string(path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let mut ev: serde_json::Value = serde_json::from_str(&lines[index]).unwrap();
    edit(&mut ev);
    lines[index] = serde_json::to_string(&ev).unwrap();
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

#[test]
fn untampered_chain_verifies_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit").join("closures.jsonl");
    write_edits(&path, 5);

    assert_eq!(verify_log(&path).unwrap(), VerifyResult::Valid { events: 5 });
}

#[test]
fn tampered_changes_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_edits(&path, 5);
    rewrite_line(&path, 2, |ev| ev["changes"]["pixAmount"]["after"] = json!(999.0));

    match verify_log(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "{reason}");
            assert!(reason.contains("hash_self mismatch"), "{reason}");
        }
        VerifyResult::Valid { events } => panic!("tampered chain verified ({events} events)"),
    }
}

#[test]
fn reassigned_closure_id_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_edits(&path, 3);
    rewrite_line(&path, 1, |ev| ev["closure_id"] = json!("closure-other"));

    match verify_log(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 2, "{reason}");
            assert!(reason.contains("event_id mismatch"), "{reason}");
        }
        VerifyResult::Valid { events } => panic!("tampered chain verified ({events} events)"),
    }
}

#[test]
fn deleted_line_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_edits(&path, 5);

    let content = std::fs::read_to_string(&path).unwrap();
    let kept: Vec<&str> = content
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .map(|(_, l)| l)
        .collect();

    match verify_log_str(&(kept.join("\n") + "\n")) {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "{reason}");
            assert!(reason.contains("seq mismatch: expected 2, got 3"), "{reason}");
        }
        VerifyResult::Valid { events } => panic!("chain with a gap verified ({events} events)"),
    }
}

#[test]
fn empty_log_is_valid() {
    assert_eq!(verify_log_str(""), VerifyResult::Valid { events: 0 });
    assert_eq!(verify_log_str("\n  \n"), VerifyResult::Valid { events: 0 });
}

#[test]
fn reopened_log_extends_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_edits(&path, 2);

    let mut log = EditLog::open(&path, true).unwrap();
    assert_eq!(log.len(), 2);
    let ev = log.record_edit("closure-42", &pix_edit(3)).unwrap().unwrap();
    assert_eq!(ev.seq, 2);
    assert!(ev.hash_prev.is_some());

    assert_eq!(verify_log(&path).unwrap(), VerifyResult::Valid { events: 3 });
}

#[test]
fn tampered_log_is_refused_for_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_edits(&path, 3);
    rewrite_line(&path, 0, |ev| ev["changed_fields"] = json!([]));
    let before = std::fs::read_to_string(&path).unwrap();

    let err = EditLog::open(&path, true).err().expect("tampered log opened");
    assert!(err.to_string().contains("AUDIT_CHAIN_BROKEN line=1"), "{err}");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn edit_event_carries_diff() {
    let before = closure("5");
    let after = closure("7,50");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let mut log = EditLog::open(&path, true).unwrap();
    let ev = log
        .record_edit_at("closure-7", &diff(&before, &after), now())
        .unwrap()
        .unwrap();
    assert_eq!(ev.closure_id, "closure-7");
    assert_eq!(ev.changed_fields, vec!["pixAmount", "systemTotal"]);

    let line = std::fs::read_to_string(&path).unwrap();
    let stored: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(stored["event_type"], CLOSURE_EDITED);
    assert_eq!(stored["seq"], 0);
    assert_eq!(stored["ts_utc"], "2024-05-01T00:00:00Z");
    assert_eq!(stored["changes"]["pixAmount"], json!({"before": 5.0, "after": 7.5}));
}

#[test]
fn empty_diff_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let record = closure("5");

    let mut log = EditLog::open(&path, true).unwrap();
    assert!(log.record_edit("closure-1", &diff(&record, &record)).unwrap().is_none());
    assert!(log.is_empty());
    assert!(!path.exists());
}

#[test]
fn unchained_log_still_links_positions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let mut log = EditLog::open(&path, false).unwrap();
    let ev = log.record_edit("c", &pix_edit(1)).unwrap().unwrap();
    assert!(ev.hash_prev.is_none() && ev.hash_self.is_none());
    log.record_edit("c", &pix_edit(2)).unwrap();

    assert_eq!(verify_log(&path).unwrap(), VerifyResult::Valid { events: 2 });
}
