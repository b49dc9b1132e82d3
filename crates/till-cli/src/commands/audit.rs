//! `till diff` and `till audit verify`.

use anyhow::{bail, Result};
use till_audit::{EditLog, VerifyResult};
use tracing::info;

use super::{load_record, print_json};

/// Where (and whether) a diff is recorded.
pub struct AuditTarget {
    pub closure_id: String,
    pub log_path: String,
    pub hash_chain: bool,
}

pub fn diff(before_path: &str, after_path: &str, audit: Option<AuditTarget>) -> Result<()> {
    let before = load_record(before_path)?;
    let after = load_record(after_path)?;

    let delta = till_closure::diff(&before, &after);
    info!(changed = delta.len(), "closure diff computed");

    if let Some(target) = audit {
        let mut log = EditLog::open(&target.log_path, target.hash_chain)?;
        match log.record_edit(&target.closure_id, &delta)? {
            Some(ev) => info!(
                closure_id = %ev.closure_id,
                event_id = %ev.event_id,
                seq = ev.seq,
                path = %target.log_path,
                "audit event appended"
            ),
            None => info!(closure_id = %target.closure_id, "no changes; audit log untouched"),
        }
    }

    print_json(&delta)
}

pub fn verify(log_path: &str) -> Result<()> {
    match till_audit::verify_log(log_path)? {
        VerifyResult::Valid { events } => {
            println!("audit_chain_valid=true events={}", events);
            Ok(())
        }
        VerifyResult::Broken { line, reason } => {
            bail!("AUDIT_CHAIN_BROKEN line={} reason={}", line, reason)
        }
    }
}
