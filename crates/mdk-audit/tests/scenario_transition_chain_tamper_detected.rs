//! Transition-log hash chain integrity.
//!
//! GREEN when:
//! - Writing a full promotion sequence, then verifying, succeeds.
//! - Mutating one event's version in the file is detected as a break.
//! - Rewriting the final event and stripping its hash_self is detected.
//! - Deleting an event is detected via hash_prev mismatch.
//! - Reopening the log continues the chain instead of restarting it.

use mdk_audit::{verify_chain, TransitionLog, VerifyResult};
use serde_json::json;
use uuid::Uuid;

fn temp_log_path(suffix: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "mdk_audit_test_{}_{}_{}",
        suffix,
        std::process::id(),
        Uuid::new_v4().as_simple()
    ))
}

fn write_promotion_sequence(path: &std::path::Path) {
    let wf = Uuid::new_v4();
    let mut log = TransitionLog::open(path).unwrap();
    log.append(wf, "news_classifier", "PROMOTION_START", None, None, json!({}))
        .unwrap();
    log.append(
        wf,
        "news_classifier",
        "SET_ALIAS",
        Some("defeated"),
        Some(3),
        json!({"was": "champion"}),
    )
    .unwrap();
    log.append(
        wf,
        "news_classifier",
        "SET_ALIAS",
        Some("champion"),
        Some(5),
        json!({"was": "challenger"}),
    )
    .unwrap();
    log.append(
        wf,
        "news_classifier",
        "DELETE_ALIAS",
        Some("challenger"),
        Some(5),
        json!({}),
    )
    .unwrap();
    log.append(wf, "news_classifier", "PROMOTION_COMPLETE", None, None, json!({}))
        .unwrap();
}

#[test]
fn untampered_chain_verifies_valid() {
    let path = temp_log_path("untampered");
    write_promotion_sequence(&path);

    let result = verify_chain(&path).unwrap();
    assert_eq!(
        result,
        VerifyResult::Valid { lines: 5 },
        "untampered chain should verify as valid with 5 lines"
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn tampered_version_detected() {
    let path = temp_log_path("tampered");
    write_promotion_sequence(&path);

    // Rewrite line 3's version without recomputing hash_self.
    {
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let mut ev: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        ev["version"] = json!(99);
        lines[2] = serde_json::to_string(&ev).unwrap();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    }

    match verify_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "tamper should be detected at line 3: {reason}");
            assert!(
                reason.contains("hash_self mismatch"),
                "reason should mention hash_self mismatch, got: {reason}"
            );
        }
        VerifyResult::Valid { lines } => {
            panic!("tampered chain should NOT verify as valid (got {lines} valid lines)");
        }
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn stripped_hash_self_on_final_event_detected() {
    let path = temp_log_path("stripped");
    write_promotion_sequence(&path);

    // Rewrite the last event and drop its hash_self. No later line exists to
    // catch this through hash_prev, so verification must reject the missing
    // content hash itself.
    {
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let last = lines.len() - 1;
        let mut ev: serde_json::Value = serde_json::from_str(&lines[last]).unwrap();
        ev["version"] = json!(99);
        ev["hash_self"] = serde_json::Value::Null;
        lines[last] = serde_json::to_string(&ev).unwrap();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    }

    match verify_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 5, "break should be reported on the rewritten line");
            assert!(
                reason.contains("hash_self missing"),
                "reason should mention the missing hash_self, got: {reason}"
            );
        }
        VerifyResult::Valid { lines } => {
            panic!("stripped-hash event should NOT verify as valid (got {lines} lines)");
        }
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn deleted_event_detected() {
    let path = temp_log_path("deleted");
    write_promotion_sequence(&path);

    {
        let content = std::fs::read_to_string(&path).unwrap();
        let kept: Vec<&str> = content
            .lines()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .map(|(_, l)| l)
            .collect();
        std::fs::write(&path, kept.join("\n") + "\n").unwrap();
    }

    match verify_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert!(
                reason.contains("hash_prev mismatch"),
                "reason should mention hash_prev mismatch, got: {reason}"
            );
            assert!(line >= 3, "break should be at line 3 or later (was at {line})");
        }
        VerifyResult::Valid { lines } => {
            panic!("chain with deleted event should NOT verify as valid (got {lines} lines)");
        }
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn reopened_log_continues_chain() {
    let path = temp_log_path("reopen");
    write_promotion_sequence(&path);

    // Second workflow appends to the same file.
    {
        let wf = Uuid::new_v4();
        let mut log = TransitionLog::open(&path).unwrap();
        assert_eq!(log.seq(), 5, "resume should count existing events");
        log.append(wf, "news_classifier", "PROMOTION_START", None, None, json!({}))
            .unwrap();
        log.append(wf, "news_classifier", "PROMOTION_COMPLETE", None, None, json!({}))
            .unwrap();
    }

    let result = verify_chain(&path).unwrap();
    assert_eq!(
        result,
        VerifyResult::Valid { lines: 7 },
        "chain must remain intact across reopen"
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn empty_log_is_valid() {
    let path = temp_log_path("empty");
    std::fs::write(&path, "").unwrap();

    let result = verify_chain(&path).unwrap();
    assert_eq!(result, VerifyResult::Valid { lines: 0 });

    let _ = std::fs::remove_file(&path);
}
