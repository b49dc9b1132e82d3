//! till-config
//!
//! Layered YAML config for the closure tooling. Layers merge in order (later
//! wins, objects merge key by key), the result is hashed over its canonical
//! JSON, and every leaf nobody reads is reported.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

pub const DEFAULT_AUDIT_LOG_PATH: &str = "closures/audit.jsonl";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Every config leaf `ClosureSettings::from_config_json` reads. Anything
/// else in a loaded config is unused.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/closure/default_employee_name",
    "/audit/log_path",
    "/audit/hash_chain",
    "/logging/filter",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// JSON pointers of unread leaves, sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Report the leaves of `config_json` outside [`CONSUMED_POINTERS`].
/// With [`UnusedKeyPolicy::Fail`] a non-clean report is an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut unused = BTreeSet::new();
    collect_unused(config_json, String::new(), &mut unused);
    let report = UnusedKeyReport {
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let first: Vec<&str> = report
            .unused_leaf_pointers
            .iter()
            .take(12)
            .map(String::as_str)
            .collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config key(s). Remove them or read them in ClosureSettings. First few: {}",
            report.unused_leaf_pointers.len(),
            first.join(", ")
        );
    }

    Ok(report)
}

/// A consumed pointer covers its whole subtree, so the walk stops there.
fn collect_unused(v: &Value, pointer: String, out: &mut BTreeSet<String>) {
    if CONSUMED_POINTERS.contains(&pointer.as_str()) {
        return;
    }
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                let token = k.replace('~', "~0").replace('/', "~1");
                collect_unused(child, format!("{pointer}/{token}"), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_unused(child, format!("{pointer}/{i}"), out);
            }
        }
        _ if pointer.is_empty() => {
            out.insert("/".to_string());
        }
        _ => {
            out.insert(pointer);
        }
    }
}

// ---------------------------------------------------------------------------
// Layered loading + hashing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// No layers: an empty object, hashed like any other config.
    pub fn empty() -> Result<Self> {
        load_layered_yaml_from_strings(&[])
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<String>>>()?;
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Earlier docs are the base, later docs override.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(serde_json::Map::new());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(raw)
            .with_context(|| format!("invalid yaml in config layer {}", i + 1))?;
        let layer = serde_json::to_value(yaml)
            .with_context(|| format!("config layer {} is not representable as json", i + 1))?;
        // An empty document parses as null and contributes nothing.
        if !layer.is_null() {
            merge_into(&mut merged, layer);
        }
    }

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; anything else in `overlay` replaces the base.
fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(&k) {
                    Some(slot) => merge_into(slot, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

/// Compact JSON with object keys in sorted order (serde_json's default map
/// is ordered by key), so reordering keys in the YAML source never changes
/// the hash.
pub fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(v).context("canonical json serialize failed")
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// ---------------------------------------------------------------------------
// Typed settings
// ---------------------------------------------------------------------------

/// Everything the closure tooling reads from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureSettings {
    pub default_employee_name: Option<String>,
    pub audit_log_path: String,
    pub audit_hash_chain: bool,
    pub log_filter: String,
}

impl Default for ClosureSettings {
    fn default() -> Self {
        Self {
            default_employee_name: None,
            audit_log_path: DEFAULT_AUDIT_LOG_PATH.to_string(),
            audit_hash_chain: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClosureSettings {
    /// Read settings from a merged config. Absent or null keys take their
    /// defaults; a key of the wrong type is an error naming its pointer.
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            default_employee_name: opt_string(config_json, "/closure/default_employee_name")?
                .filter(|s| !s.trim().is_empty()),
            audit_log_path: opt_string(config_json, "/audit/log_path")?
                .unwrap_or(defaults.audit_log_path),
            audit_hash_chain: opt_bool(config_json, "/audit/hash_chain")?
                .unwrap_or(defaults.audit_hash_chain),
            log_filter: opt_string(config_json, "/logging/filter")?
                .unwrap_or(defaults.log_filter),
        })
    }
}

fn opt_string(v: &Value, ptr: &str) -> Result<Option<String>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => bail!("CONFIG_TYPE_MISMATCH leaf={ptr} expected=string got={other}"),
    }
}

fn opt_bool(v: &Value, ptr: &str) -> Result<Option<bool>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => bail!("CONFIG_TYPE_MISMATCH leaf={ptr} expected=bool got={other}"),
    }
}
