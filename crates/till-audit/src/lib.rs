//! till-audit
//!
//! Edit history for stored closures: one JSON line per non-empty diff,
//! appended to a log that is optionally sealed with a SHA-256 hash chain.
//!
//! Every event records its position (`seq`) and the hash of the event before
//! it (`hash_prev`), so gaps, reordering and edits in the file are all caught
//! by [`verify_log`]. [`EditLog::open`] runs the same walk and refuses to
//! append onto a log that does not verify.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use till_closure::ClosureDiff;
use uuid::Uuid;

pub const CLOSURE_EDITED: &str = "CLOSURE_EDITED";

/// Fixed forever: changing it changes every derived id.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_83a2_4d0e_5b7a_9e31_c4f2_07d8_a915);

/// One recorded edit of a stored closure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureEditEvent {
    pub event_id: Uuid,
    /// Position in the log, from 0.
    pub seq: u64,
    pub closure_id: String,
    pub ts_utc: DateTime<Utc>,
    pub event_type: String,
    pub changed_fields: Vec<String>,
    /// The diff as serialized by [`ClosureDiff`]: `{ field: { before, after } }`.
    pub changes: Value,
    pub hash_prev: Option<String>,
    /// Absent when the log is written without the hash chain.
    pub hash_self: Option<String>,
}

impl ClosureEditEvent {
    /// SHA-256 of the event's canonical line with `hash_self` cleared.
    pub fn content_hash(&self) -> Result<String> {
        let unsealed = Self {
            hash_self: None,
            ..self.clone()
        };
        let line = canonical_line(&unsealed)?;
        Ok(hex::encode(Sha256::digest(line.as_bytes())))
    }
}

/// `event_id` = UUIDv5 over (closure id, seq, previous hash). No RNG: the
/// same history written twice gets the same ids.
pub fn derive_event_id(closure_id: &str, seq: u64, hash_prev: Option<&str>) -> Uuid {
    let name = format!("{}|{}|{}", closure_id, seq, hash_prev.unwrap_or(""));
    Uuid::new_v5(&EVENT_ID_NAMESPACE, name.as_bytes())
}

/// Compact JSON with object keys in sorted order (serde_json's default map
/// is key-ordered).
fn canonical_line<T: Serialize>(v: &T) -> Result<String> {
    let value = serde_json::to_value(v).context("serialize audit event failed")?;
    serde_json::to_string(&value).context("json stringify failed")
}

// ---------------------------------------------------------------------------
// Chain walk
// ---------------------------------------------------------------------------

/// Where the next event goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ChainTail {
    next_seq: u64,
    last_hash: Option<String>,
}

/// Result of walking a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { events: u64 },
    /// `line` is 1-based and counts blank lines.
    Broken { line: usize, reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid { .. })
    }
}

enum Walk {
    Intact(ChainTail),
    Broken { line: usize, reason: String },
}

fn walk(content: &str) -> Walk {
    let mut tail = ChainTail::default();
    for (i, text) in content.lines().enumerate() {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let ev: ClosureEditEvent = match serde_json::from_str(text) {
            Ok(ev) => ev,
            Err(e) => {
                return Walk::Broken {
                    line: i + 1,
                    reason: format!("unreadable event: {e}"),
                }
            }
        };
        if let Err(reason) = check_link(&ev, &tail) {
            return Walk::Broken { line: i + 1, reason };
        }
        tail = ChainTail {
            next_seq: ev.seq + 1,
            last_hash: ev.hash_self,
        };
    }
    Walk::Intact(tail)
}

fn check_link(ev: &ClosureEditEvent, tail: &ChainTail) -> Result<(), String> {
    if ev.seq != tail.next_seq {
        return Err(format!(
            "seq mismatch: expected {}, got {}",
            tail.next_seq, ev.seq
        ));
    }
    if ev.hash_prev != tail.last_hash {
        return Err(format!(
            "hash_prev mismatch: expected {:?}, got {:?}",
            tail.last_hash, ev.hash_prev
        ));
    }
    let expected_id = derive_event_id(&ev.closure_id, ev.seq, ev.hash_prev.as_deref());
    if ev.event_id != expected_id {
        return Err(format!(
            "event_id mismatch: expected {}, got {}",
            expected_id, ev.event_id
        ));
    }
    if let Some(claimed) = &ev.hash_self {
        let recomputed = ev.content_hash().map_err(|e| e.to_string())?;
        if *claimed != recomputed {
            return Err(format!(
                "hash_self mismatch: claimed {}, recomputed {}",
                claimed, recomputed
            ));
        }
    }
    Ok(())
}

/// Verify an audit log file.
pub fn verify_log(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("read audit log {:?}", path))?;
    Ok(verify_log_str(&content))
}

/// Same as [`verify_log`] over in-memory JSONL content.
pub fn verify_log_str(content: &str) -> VerifyResult {
    match walk(content) {
        Walk::Intact(tail) => VerifyResult::Valid {
            events: tail.next_seq,
        },
        Walk::Broken { line, reason } => VerifyResult::Broken { line, reason },
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Append-only closure edit log.
pub struct EditLog {
    path: PathBuf,
    hash_chain: bool,
    tail: ChainTail,
}

impl EditLog {
    /// Open `path` for appending, creating parent dirs. A missing file is an
    /// empty log; an existing one must verify.
    pub fn open(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }

        let tail = match fs::read_to_string(&path) {
            Ok(content) => match walk(&content) {
                Walk::Intact(tail) => tail,
                Walk::Broken { line, reason } => bail!(
                    "AUDIT_CHAIN_BROKEN line={} reason={}; refusing to append to {:?}",
                    line,
                    reason,
                    path
                ),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => ChainTail::default(),
            Err(e) => return Err(e).with_context(|| format!("read audit log {:?}", path)),
        };

        Ok(Self {
            path,
            hash_chain,
            tail,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Events already in the log.
    pub fn len(&self) -> u64 {
        self.tail.next_seq
    }

    pub fn is_empty(&self) -> bool {
        self.tail.next_seq == 0
    }

    /// Record `diff` against `closure_id`. An empty diff is not an edit and
    /// writes nothing.
    pub fn record_edit(
        &mut self,
        closure_id: &str,
        diff: &ClosureDiff,
    ) -> Result<Option<ClosureEditEvent>> {
        self.record_edit_at(closure_id, diff, Utc::now())
    }

    /// Same as [`EditLog::record_edit`] with the event timestamp supplied.
    pub fn record_edit_at(
        &mut self,
        closure_id: &str,
        diff: &ClosureDiff,
        ts_utc: DateTime<Utc>,
    ) -> Result<Option<ClosureEditEvent>> {
        if diff.is_empty() {
            return Ok(None);
        }

        let seq = self.tail.next_seq;
        let hash_prev = self.tail.last_hash.clone();
        let mut ev = ClosureEditEvent {
            event_id: derive_event_id(closure_id, seq, hash_prev.as_deref()),
            seq,
            closure_id: closure_id.to_string(),
            ts_utc,
            event_type: CLOSURE_EDITED.to_string(),
            changed_fields: diff.changed_fields().into_iter().map(str::to_string).collect(),
            changes: serde_json::to_value(diff).context("serialize closure diff failed")?,
            hash_prev,
            hash_self: None,
        };
        if self.hash_chain {
            ev.hash_self = Some(ev.content_hash()?);
        }

        let mut line = canonical_line(&ev)?;
        line.push('\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open audit log {:?}", self.path))?;
        f.write_all(line.as_bytes())
            .context("write audit line failed")?;

        self.tail = ChainTail {
            next_seq: seq + 1,
            last_hash: ev.hash_self.clone(),
        };
        Ok(Some(ev))
    }
}
