//! Total Expense Tool
//!
//! `getTotalExpense`: sum of every recorded expense.
//! The `from`/`to` range is part of the published signature but is not
//! applied; the total always covers the whole ledger, whatever shape the
//! bounds arrive in.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use agent_core::{
    ParameterSchema, Result as CoreResult, Tool, ToolResult, ToolSchema, parse_arguments,
};

use crate::model::{SharedBook, format_money};

#[derive(Debug, Deserialize)]
struct RangeArgs {
    #[serde(default)]
    from: Option<Value>,
    #[serde(default)]
    to: Option<Value>,
}

/// Tool reporting total expenses
pub struct TotalExpenseTool {
    book: SharedBook,
}

impl TotalExpenseTool {
    pub const fn new(book: SharedBook) -> Self {
        Self { book }
    }
}

#[async_trait]
impl Tool for TotalExpenseTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "getTotalExpense".into(),
            description: "Get total expense from date to date".into(),
            parameters: vec![
                ParameterSchema::optional("from", "string", "From date to get the expense"),
                ParameterSchema::optional("to", "string", "To date to get the expense"),
            ],
            category: Some("ledger".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, args: &Value) -> CoreResult<ToolResult> {
        let range: RangeArgs = parse_arguments(args)?;
        if range.from.is_some() || range.to.is_some() {
            tracing::debug!(from = ?range.from, to = ?range.to, "Date range ignored; totalling all expenses");
        }

        let total = self.book.read().await.total_expense();
        Ok(ToolResult::success("getTotalExpense", format_money(total)))
    }
}
