//! Command handler modules for the `till` CLI.
//!
//! Shared file helpers live here; command logic lives in the submodules.

pub mod audit;
pub mod closure;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use till_closure::{CanonicalClosure, RawClosureInput};
use tracing::info;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Read a JSON text file, tolerating a UTF-8 BOM (spreadsheet exports on
/// Windows carry one).
pub fn read_json_text(path: &str) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read failed: {}", path))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let raw = String::from_utf8(bytes.to_vec())
        .with_context(|| format!("{} must be UTF-8 text", path))?;
    Ok(raw.trim().to_string())
}

/// Load a raw submission, keeping label order.
pub fn load_raw_input(path: &str) -> Result<RawClosureInput> {
    let text = read_json_text(path)?;
    let raw = RawClosureInput::from_json_str(&text)
        .with_context(|| format!("{} must contain a JSON object", path))?;
    info!(path, labels = raw.len(), "raw closure loaded");
    Ok(raw)
}

/// Load a stored canonical record. Base fields are re-validated and derived
/// amounts recomputed.
pub fn load_record(path: &str) -> Result<CanonicalClosure> {
    let text = read_json_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a valid closure record", path))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output json failed")?;
    println!("{}", json);
    Ok(())
}
