//! Money Balance Tool

use async_trait::async_trait;
use serde_json::Value;

use agent_core::{Result as CoreResult, Tool, ToolResult, ToolSchema};

use crate::model::{SharedBook, format_money};

/// Tool reporting income minus expenses
pub struct MoneyBalanceTool {
    book: SharedBook,
}

impl MoneyBalanceTool {
    pub const fn new(book: SharedBook) -> Self {
        Self { book }
    }
}

#[async_trait]
impl Tool for MoneyBalanceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "getMoneyBalance".into(),
            description: "Get remaining money balance from database.".into(),
            parameters: Vec::new(),
            category: Some("ledger".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, _args: &Value) -> CoreResult<ToolResult> {
        let balance = self.book.read().await.balance();
        Ok(ToolResult::success("getMoneyBalance", format_money(balance)))
    }
}
