//! Domain Models
//!
//! Expense and income ledgers. Uses `rust_decimal` for all monetary
//! values - never use f64 for money!

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{LedgerError, Result};

/// Currency every amount is denominated in
pub const CURRENCY: &str = "INR";

/// Which ledger an entry belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Expense,
    Income,
}

impl EntryKind {
    /// Name of the tool that records this kind of entry
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::Expense => "addExpense",
            Self::Income => "addIncome",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expense => write!(f, "expense"),
            Self::Income => write!(f, "income"),
        }
    }
}

/// A single recorded expense or income. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    name: String,

    #[serde(with = "rust_decimal::serde::str")]
    amount: Decimal,

    timestamp: DateTime<Utc>,
}

impl Entry {
    /// Validate and stamp a new entry with the current instant
    pub fn new(kind: EntryKind, name: impl Into<String>, amount: Decimal) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidEntry { kind, reason: "name is blank" });
        }
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LedgerError::InvalidEntry { kind, reason: "amount is negative" });
        }

        Ok(Self {
            name,
            amount: amount.normalize(),
            timestamp: Utc::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Append-only list of entries in insertion order
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<Entry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, entry: Entry) -> &Entry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Sum of all amounts. `FinanceBook::record` keeps it within `Decimal::MAX`.
    pub fn total(&self) -> Decimal {
        self.entries
            .iter()
            .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.amount()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Both ledgers of one user. Lives for the process only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FinanceBook {
    expenses: Ledger,
    incomes: Ledger,
}

/// Book shared by the tools that read and write it
pub type SharedBook = Arc<RwLock<FinanceBook>>;

impl FinanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh, empty book ready to hand to the tools
    pub fn shared() -> SharedBook {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Validate and append an entry; nothing changes when validation fails.
    ///
    /// An entry that would take its ledger's total past `Decimal::MAX` is
    /// rejected, so totals and the balance can always be computed.
    pub fn record(&mut self, kind: EntryKind, name: impl Into<String>, amount: Decimal) -> Result<&Entry> {
        let entry = Entry::new(kind, name, amount)?;
        if self.ledger(kind).total().checked_add(entry.amount()).is_none() {
            return Err(LedgerError::TotalOverflow { kind });
        }
        Ok(self.ledger_mut(kind).append(entry))
    }

    pub const fn ledger(&self, kind: EntryKind) -> &Ledger {
        match kind {
            EntryKind::Expense => &self.expenses,
            EntryKind::Income => &self.incomes,
        }
    }

    const fn ledger_mut(&mut self, kind: EntryKind) -> &mut Ledger {
        match kind {
            EntryKind::Expense => &mut self.expenses,
            EntryKind::Income => &mut self.incomes,
        }
    }

    pub fn total_expense(&self) -> Decimal {
        self.expenses.total()
    }

    pub fn total_income(&self) -> Decimal {
        self.incomes.total()
    }

    /// Income minus expenses; may be negative.
    ///
    /// Both totals lie in `0..=Decimal::MAX`, so the difference always fits.
    pub fn balance(&self) -> Decimal {
        self.total_income().saturating_sub(self.total_expense())
    }
}

/// Render an amount without trailing zeros, e.g. `50000` or `12.5`
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Render an amount with the currency suffix, e.g. `50000 INR`
pub fn format_money(amount: Decimal) -> String {
    format!("{} {CURRENCY}", format_amount(amount))
}
