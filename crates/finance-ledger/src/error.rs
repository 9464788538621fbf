//! Error Types for the Finance Ledger

use thiserror::Error;

use crate::model::EntryKind;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// Entry failed validation; `reason` is for logs, the message is for the model
    #[error("Invalid {kind} data. Name and positive amount are required.")]
    InvalidEntry {
        kind: EntryKind,
        reason: &'static str,
    },

    /// Appending would push the ledger total past what `Decimal` can hold
    #[error("Cannot add this {kind}: the total {kind} amount would be too large to record.")]
    TotalOverflow { kind: EntryKind },
}
