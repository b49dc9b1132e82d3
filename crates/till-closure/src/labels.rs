//! Label normalization: free-form column names to canonical fields.
//!
//! Resolution order for a raw label:
//! 1. trim; an empty label is ignored
//! 2. exact lookup of the trimmed label in the alias table
//! 3. lookup of the folded key (accents stripped, lower-cased, every
//!    non-alphanumeric character dropped)
//! 4. otherwise the trimmed label passes through unchanged
//!
//! Folding concatenates rather than separating, so `"Crédito (Sist)"`,
//! `"credito_sist"` and `"CREDITO(SIST)"` all become `"creditosist"`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::field::ClosureField;
use crate::raw::{RawClosureInput, RawValue};

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// Folded aliases. Canonical identifiers are added separately (folded), so
/// every field is always reachable by its own name.
const FOLDED_ALIASES: &[(&str, ClosureField)] = &[
    ("data", ClosureField::OperationDate),
    ("dataoperacao", ClosureField::OperationDate),
    ("datadaoperacao", ClosureField::OperationDate),
    ("datafechamento", ClosureField::OperationDate),
    ("dia", ClosureField::OperationDate),
    ("date", ClosureField::OperationDate),
    ("funcionario", ClosureField::EmployeeName),
    ("funcionarionome", ClosureField::EmployeeName),
    ("nomefuncionario", ClosureField::EmployeeName),
    ("operador", ClosureField::EmployeeName),
    ("responsavel", ClosureField::EmployeeName),
    ("employee", ClosureField::EmployeeName),
    ("dinheiro", ClosureField::CashSystemAmount),
    ("dinheirosistema", ClosureField::CashSystemAmount),
    ("dinheirosist", ClosureField::CashSystemAmount),
    ("cashsystem", ClosureField::CashSystemAmount),
    ("credito", ClosureField::CreditSystemAmount),
    ("creditosistema", ClosureField::CreditSystemAmount),
    ("creditosist", ClosureField::CreditSystemAmount),
    ("debito", ClosureField::DebitSystemAmount),
    ("debitosistema", ClosureField::DebitSystemAmount),
    ("debitosist", ClosureField::DebitSystemAmount),
    ("creditomaquina", ClosureField::CreditTerminalAmount),
    ("creditomaq", ClosureField::CreditTerminalAmount),
    ("debitomaquina", ClosureField::DebitTerminalAmount),
    ("debitomaq", ClosureField::DebitTerminalAmount),
    ("pagonline", ClosureField::OnlinePaymentAmount),
    ("pagamentoonline", ClosureField::OnlinePaymentAmount),
    ("online", ClosureField::OnlinePaymentAmount),
    ("pix", ClosureField::PixAmount),
    ("totalcaixadinheiro", ClosureField::CountedCashAmount),
    ("caixadinheiro", ClosureField::CountedCashAmount),
    ("dinheirocontado", ClosureField::CountedCashAmount),
    ("totalcaixa", ClosureField::CountedCashAmount),
    ("abertura", ClosureField::OpeningFloat),
    ("fundodecaixa", ClosureField::OpeningFloat),
    ("fundocaixa", ClosureField::OpeningFloat),
    ("trocoinicial", ClosureField::OpeningFloat),
    ("reforco", ClosureField::ReinforcementAmount),
    ("reforcocaixa", ClosureField::ReinforcementAmount),
    ("gastos", ClosureField::ExpensesAmount),
    ("despesas", ClosureField::ExpensesAmount),
    ("custo", ClosureField::ExpensesAmount),
    ("custos", ClosureField::ExpensesAmount),
    ("valorparadeposito", ClosureField::DepositAmount),
    ("valordeposito", ClosureField::DepositAmount),
    ("deposito", ClosureField::DepositAmount),
    ("entregacartao", ClosureField::CardDeliveryCount),
    ("entregacartoes", ClosureField::CardDeliveryCount),
    ("picolessist", ClosureField::PopsicleSystemCount),
    ("picolessistema", ClosureField::PopsicleSystemCount),
    ("picoles", ClosureField::PopsicleSystemCount),
    ("observacoes", ClosureField::Notes),
    ("observacao", ClosureField::Notes),
    ("obs", ClosureField::Notes),
];

/// Spreadsheet headers matched verbatim, before folding. Their folded forms
/// (`"valorpdeposito"`, `"dinheirocaixa"`, ...) are not aliases.
const EXACT_ALIASES: &[(&str, ClosureField)] = &[
    ("Valor p/ Depósito", ClosureField::DepositAmount),
    ("Dinheiro (Caixa)", ClosureField::CountedCashAmount),
    ("Nº Entregas Cartão", ClosureField::CardDeliveryCount),
    ("Qtd. Picolés (Sist)", ClosureField::PopsicleSystemCount),
];

/// The immutable alias table, built once.
pub fn alias_table() -> &'static BTreeMap<String, ClosureField> {
    static TABLE: OnceLock<BTreeMap<String, ClosureField>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = BTreeMap::new();
        for field in ClosureField::ALL {
            table.insert(fold_label(field.name()), field);
        }
        for (alias, field) in FOLDED_ALIASES {
            table.insert((*alias).to_string(), *field);
        }
        for (alias, field) in EXACT_ALIASES {
            table.insert((*alias).to_string(), *field);
        }
        table
    })
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Result of resolving one raw label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Canonical(ClosureField),
    /// Unrecognized; kept verbatim (trimmed) so no input is silently lost.
    Passthrough(String),
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Canonical(f) => f.name(),
            Label::Passthrough(s) => s,
        }
    }

    pub fn field(&self) -> Option<ClosureField> {
        match self {
            Label::Canonical(f) => Some(*f),
            Label::Passthrough(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fold a label: decompose, drop combining marks, lower-case, keep only
/// alphanumerics.
pub fn fold_label(raw: &str) -> String {
    raw.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Resolve a raw label. Returns `None` for an empty (or whitespace) label.
pub fn normalize_label(raw: &str) -> Option<Label> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let table = alias_table();
    if let Some(field) = table.get(trimmed) {
        return Some(Label::Canonical(*field));
    }
    if let Some(field) = table.get(&fold_label(trimmed)) {
        return Some(Label::Canonical(*field));
    }
    Some(Label::Passthrough(trimmed.to_string()))
}

// ---------------------------------------------------------------------------
// Canonically keyed input
// ---------------------------------------------------------------------------

/// A recognized value together with the raw label it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedValue {
    pub source_key: String,
    pub value: RawValue,
}

/// Raw input re-keyed by canonical field (last write wins).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalInput {
    fields: BTreeMap<ClosureField, SourcedValue>,
    passthrough: Vec<(String, RawValue)>,
}

impl CanonicalInput {
    pub fn get(&self, field: ClosureField) -> Option<&SourcedValue> {
        self.fields.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (ClosureField, &SourcedValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    /// Unrecognized labels, in submission order.
    pub fn passthrough_keys(&self) -> impl Iterator<Item = &str> {
        self.passthrough.iter().map(|(k, _)| k.as_str())
    }
}

/// Re-key a raw submission by canonical field.
///
/// Empty labels are dropped. When several labels resolve to the same field,
/// the one appearing last in the submission wins.
pub fn canonicalize(raw: &RawClosureInput) -> CanonicalInput {
    let mut out = CanonicalInput::default();
    for (key, value) in raw.iter() {
        match normalize_label(key) {
            None => {}
            Some(Label::Canonical(field)) => {
                out.fields.insert(
                    field,
                    SourcedValue {
                        source_key: key.trim().to_string(),
                        value: value.clone(),
                    },
                );
            }
            Some(Label::Passthrough(name)) => out.passthrough.push((name, value.clone())),
        }
    }
    out
}
