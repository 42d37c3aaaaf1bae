//! Append-only transition log for registry alias mutations.
//!
//! The promotion-approval workflow performs a multi-step alias swap with no
//! transactional guarantee from the registry. This log is the compensating
//! record: every applied mutation is appended (JSON Lines, one event per
//! line) with a SHA-256 hash chain, so a failure mid-sequence leaves a
//! verifiable trail of exactly which steps were applied and in what order.
//! Rollback stays a manual operation; the log makes it possible.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One recorded step of a promotion workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Deterministically derived from chain state + content (no RNG), so
    /// replaying the same workflow against the same log yields the same ids.
    pub event_id: Uuid,
    /// Groups all steps of one workflow invocation.
    pub workflow_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub model_name: String,
    /// Step kind, e.g. `PROMOTION_START`, `SET_ALIAS`, `DELETE_ALIAS`,
    /// `UPDATE_DESCRIPTION`, `PROMOTION_COMPLETE`.
    pub action: String,
    /// Alias touched by this step, when applicable.
    pub alias: Option<String>,
    /// Version touched by this step, when applicable.
    pub version: Option<i64>,
    /// Free-form step detail (comparison snapshot, replaced version, ...).
    pub detail: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Append-only writer. One instance per workflow invocation; resuming an
/// existing file continues the chain from its last line.
pub struct TransitionLog {
    path: PathBuf,
    last_hash: Option<String>,
    seq: u64,
}

impl TransitionLog {
    /// Open the log at `path`, creating parent directories as needed.
    /// If the file already exists, the chain is resumed from its last event.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create_dir_all {:?}", parent))?;
            }
        }

        let (last_hash, seq) = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("read transition log {:?}", path))?;
            resume_state(&content)?
        } else {
            (None, 0)
        };

        Ok(Self {
            path,
            last_hash,
            seq,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of events appended so far (including resumed history).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Append one event and return it with hashes filled in.
    pub fn append(
        &mut self,
        workflow_id: Uuid,
        model_name: &str,
        action: &str,
        alias: Option<&str>,
        version: Option<i64>,
        detail: Value,
    ) -> Result<TransitionEvent> {
        let event_id = derive_event_id(self.last_hash.as_deref(), self.seq, model_name, action);
        self.seq += 1;

        let mut ev = TransitionEvent {
            event_id,
            workflow_id,
            ts_utc: Utc::now(),
            model_name: model_name.to_string(),
            action: action.to_string(),
            alias: alias.map(str::to_string),
            version,
            detail,
            hash_prev: self.last_hash.clone(),
            hash_self: None,
        };

        let self_hash = compute_event_hash(&ev)?;
        ev.hash_self = Some(self_hash.clone());
        self.last_hash = Some(self_hash);

        let line = canonical_json_line(&ev)?;
        append_line(&self.path, &line)?;

        Ok(ev)
    }
}

/// Scan existing content to restore (last_hash, seq) for chain continuation.
fn resume_state(content: &str) -> Result<(Option<String>, u64)> {
    let mut last_hash = None;
    let mut seq = 0u64;
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let ev: TransitionEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse transition event at line {}", i + 1))?;
        last_hash = ev.hash_self;
        seq += 1;
    }
    Ok((last_hash, seq))
}

/// Event id derivation: UUIDv5 over chain position + content identity.
/// Chain state is part of the input so ids differ across histories even when
/// the same step repeats.
fn derive_event_id(last_hash: Option<&str>, seq: u64, model_name: &str, action: &str) -> Uuid {
    let material = format!(
        "{}|{}|{}|{}",
        last_hash.unwrap_or("GENESIS"),
        seq,
        model_name,
        action
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, material.as_bytes())
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open transition log {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write transition line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Canonicalize by sorting keys recursively, compact JSON, one event per line.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize transition event failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Event hash excludes `hash_self` (no self-reference).
pub fn compute_event_hash(ev: &TransitionEvent) -> Result<String> {
    let mut clone = ev.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Verify the hash chain of a transition log file.
pub fn verify_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read transition log {:?}", path.as_ref()))?;
    verify_chain_str(&content)
}

/// Same as [`verify_chain`], operating on in-memory JSONL content.
pub fn verify_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let ev: TransitionEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse transition event at line {}", i + 1))?;
        line_count += 1;

        if ev.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, ev.hash_prev
                ),
            });
        }

        // Every appended event carries hash_self; an event without one was
        // not written by this log and must not verify.
        let claimed = match ev.hash_self {
            Some(ref h) => h,
            None => {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: "hash_self missing".to_string(),
                });
            }
        };
        let recomputed = compute_event_hash(&ev)?;
        if *claimed != recomputed {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_self mismatch: claimed {}, recomputed {}",
                    claimed, recomputed
                ),
            });
        }

        prev_hash = ev.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

/// Result of chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}
