//! `till build`, `till present`, `till preview`.

use anyhow::{bail, Result};
use serde::Serialize;
use till_closure::{build_canonical, canonicalize, BuildOptions, PartialAmounts, Reconciliation};
use tracing::{info, warn};

use super::{load_raw_input, load_record, print_json};

pub fn build(input: &str, default_employee: Option<String>, present: bool) -> Result<()> {
    let raw = load_raw_input(input)?;

    let canonical = canonicalize(&raw);
    for key in canonical.passthrough_keys() {
        warn!(label = key, "unrecognized label ignored");
    }

    let options = BuildOptions {
        default_employee_name: default_employee,
    };
    let record = match build_canonical(&canonical, &options) {
        Ok(record) => record,
        Err(err) => {
            warn!(errors = err.field_errors().len(), error = %err, "closure rejected");
            bail!("CLOSURE_INVALID: {}", err);
        }
    };
    info!(
        system_total = %record.system_total(),
        cash_variance = %record.cash_variance(),
        "closure built"
    );

    if present {
        print_json(&till_closure::present(Some(&record)))
    } else {
        print_json(&record)
    }
}

pub fn present(record_path: &str) -> Result<()> {
    let record = load_record(record_path)?;
    print_json(&till_closure::present(Some(&record)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Preview {
    #[serde(flatten)]
    reconciliation: Reconciliation,
    /// Monetary fields that parsed; everything else counted as zero.
    fields_used: usize,
}

pub fn preview(input: &str) -> Result<()> {
    let raw = load_raw_input(input)?;
    let amounts = PartialAmounts::from_raw(&raw);
    print_json(&Preview {
        reconciliation: Reconciliation::of(&amounts),
        fields_used: amounts.len(),
    })
}
