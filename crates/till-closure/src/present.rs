//! Read-side view of a stored closure.

use serde::Serialize;

use crate::money::Money;
use crate::reconcile::drawer_cash_expected;
use crate::record::CanonicalClosure;

/// A closure plus `drawerCashExpected`, recomputed from its base fields at
/// presentation time and never read from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedClosure {
    #[serde(flatten)]
    pub record: CanonicalClosure,
    pub drawer_cash_expected: Money,
}

pub fn present(record: Option<&CanonicalClosure>) -> Option<PresentedClosure> {
    record.map(|r| PresentedClosure {
        record: r.clone(),
        drawer_cash_expected: drawer_cash_expected(r),
    })
}
