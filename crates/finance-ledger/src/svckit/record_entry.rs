//! Record Entry Tool
//!
//! `addExpense` and `addIncome`: append a validated entry to one ledger.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use agent_core::{
    ParameterSchema, Result as CoreResult, Tool, ToolResult, ToolSchema, parse_arguments,
};

use crate::error::LedgerError;
use crate::model::{CURRENCY, EntryKind, SharedBook, format_amount};

#[derive(Debug, Deserialize)]
struct EntryArgs {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
}

/// Tool that records an expense or an income
pub struct RecordEntryTool {
    kind: EntryKind,
    book: SharedBook,
}

impl RecordEntryTool {
    pub const fn new(kind: EntryKind, book: SharedBook) -> Self {
        Self { kind, book }
    }

    pub const fn expense(book: SharedBook) -> Self {
        Self::new(EntryKind::Expense, book)
    }

    pub const fn income(book: SharedBook) -> Self {
        Self::new(EntryKind::Income, book)
    }
}

#[async_trait]
impl Tool for RecordEntryTool {
    fn schema(&self) -> ToolSchema {
        let (description, name_hint) = match self.kind {
            EntryKind::Expense => (
                "Add new expense entry to the expense database.",
                "Name of the expense. e.g., Bought an iphone",
            ),
            EntryKind::Income => (
                "Add new income entry to income database",
                "Name of the income. e.g., Got salary",
            ),
        };

        ToolSchema {
            name: self.kind.tool_name().into(),
            description: description.into(),
            parameters: vec![
                ParameterSchema::required("name", "string", name_hint),
                ParameterSchema::required(
                    "amount",
                    "number",
                    format!("Amount of the {}.", self.kind),
                ),
            ],
            category: Some("ledger".into()),
            has_side_effects: true,
        }
    }

    async fn execute(&self, args: &Value) -> CoreResult<ToolResult> {
        let tool = self.kind.tool_name();

        let parsed = match parse_arguments::<EntryArgs>(args) {
            Ok(EntryArgs { name: Some(name), amount: Some(amount) }) => Ok((name, amount)),
            Ok(_) => Err(LedgerError::InvalidEntry {
                kind: self.kind,
                reason: "name or amount missing",
            }),
            Err(_) => Err(LedgerError::InvalidEntry {
                kind: self.kind,
                reason: "arguments have the wrong types",
            }),
        };

        // The write lock is held until the entry is in the ledger, so the
        // confirmation never runs ahead of the data.
        let mut book = self.book.write().await;
        let recorded = match parsed {
            Ok((name, amount)) => book.record(self.kind, name, amount),
            Err(e) => Err(e),
        };

        match recorded {
            Ok(entry) => {
                tracing::info!(kind = %self.kind, name = entry.name(), amount = %entry.amount(), "Entry recorded");
                Ok(ToolResult::success(
                    tool,
                    format!(
                        "Added {}: {} - {} {CURRENCY} to the database.",
                        self.kind,
                        entry.name(),
                        format_amount(entry.amount())
                    ),
                ))
            }
            Err(e) => {
                match &e {
                    LedgerError::InvalidEntry { reason, .. } => {
                        tracing::debug!(kind = %self.kind, reason, "Entry rejected");
                    }
                    LedgerError::TotalOverflow { .. } => {
                        tracing::warn!(kind = %self.kind, "Entry rejected, ledger total would overflow");
                    }
                }
                Ok(ToolResult::failure(tool, format!("Error: {e}")))
            }
        }
    }
}
