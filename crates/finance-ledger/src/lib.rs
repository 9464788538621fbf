//! # finance-ledger
//!
//! In-memory personal finance ledger and the agent tools that operate on it.
//!
//! ## Tools
//!
//! ```text
//! ┌──────────────────┬───────────────────────────────┬──────────┐
//! │ tool             │ does                          │ writes?  │
//! ├──────────────────┼───────────────────────────────┼──────────┤
//! │ getTotalExpense  │ sum of all expenses           │ no       │
//! │ addExpense       │ append to the expense ledger  │ yes      │
//! │ addIncome        │ append to the income ledger   │ yes      │
//! │ getMoneyBalance  │ income - expenses             │ no       │
//! └──────────────────┴───────────────────────────────┴──────────┘
//! ```
//!
//! All tools share one [`SharedBook`]; nothing is global, so two sessions
//! with two books never see each other's entries.

pub mod svckit;
pub mod model;
pub mod error;

use chrono::{DateTime, Utc};

use agent_core::{Result as CoreResult, ToolRegistry};

pub use error::{LedgerError, Result};
pub use model::{CURRENCY, Entry, EntryKind, FinanceBook, Ledger, SharedBook, format_money};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{MoneyBalanceTool, RecordEntryTool, TotalExpenseTool};
}

/// Registry holding the four finance tools, all bound to `book`
pub fn finance_tools(book: &SharedBook) -> CoreResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(tools::TotalExpenseTool::new(book.clone()))?;
    registry.register(tools::RecordEntryTool::expense(book.clone()))?;
    registry.register(tools::RecordEntryTool::income(book.clone()))?;
    registry.register(tools::MoneyBalanceTool::new(book.clone()))?;
    Ok(registry)
}

/// System prompt for the finance assistant, stamped with the current time
pub fn system_prompt(now: DateTime<Utc>) -> String {
    format!(
        r#"You are FinAI, a personal finance assistant. Help the user keep track of what they earn and spend, and give clear, practical guidance.

## Personality
- Friendly, professional and patient
- Explain what you are doing and why
- Ask a clarifying question when a request is ambiguous

## Tools
1. `getTotalExpense(from, to)` - total of recorded expenses, in {CURRENCY}
2. `addExpense(name, amount)` - record an expense; amount must not be negative
3. `addIncome(name, amount)` - record an income; amount must not be negative
4. `getMoneyBalance()` - income minus expenses, in {CURRENCY}

## Guidelines
- Ask for both a name and an amount before recording anything
- Confirm every entry you record
- Show the balance when it helps the user understand their situation
- If a tool returns an error, explain it plainly and suggest what to do next

## Context
- Current datetime: {now}
- Currency: Indian Rupees ({CURRENCY})
- Data is kept in memory only and is lost when the program exits"#,
        now = now.format("%a, %d %b %Y %H:%M:%S GMT"),
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_finance_tools_registered_in_order() {
        let registry = finance_tools(&FinanceBook::shared()).unwrap();
        assert_eq!(
            registry.names(),
            vec!["getTotalExpense", "addExpense", "addIncome", "getMoneyBalance"]
        );
    }

    #[test]
    fn test_books_are_isolated() {
        let first = FinanceBook::shared();
        let second = FinanceBook::shared();
        assert!(finance_tools(&first).is_ok());
        assert!(finance_tools(&second).is_ok());
        assert!(!std::sync::Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_registry_round_trip() {
        let book = FinanceBook::shared();
        let registry = finance_tools(&book).unwrap();

        let added = registry
            .execute_raw("addIncome", r#"{"name": "Salary", "amount": 50000}"#)
            .await;
        assert_eq!(added, "Added income: Salary - 50000 INR to the database.");
        assert_eq!(registry.execute_raw("getMoneyBalance", "{}").await, "50000 INR");

        let before = book.read().await.ledger(EntryKind::Expense).len();
        let rejected = registry
            .execute_raw("addExpense", r#"{"name": "", "amount": 100}"#)
            .await;
        assert_eq!(
            rejected,
            "Error: Invalid expense data. Name and positive amount are required."
        );
        assert_eq!(book.read().await.ledger(EntryKind::Expense).len(), before);
    }

    #[tokio::test]
    async fn test_total_expense_sees_every_add() {
        let book = FinanceBook::shared();
        let registry = finance_tools(&book).unwrap();
        for (name, amount) in [("Rent", "15000"), ("Food", "3200.5"), ("Bus", "0")] {
            let args = format!(r#"{{"name": "{name}", "amount": {amount}}}"#);
            registry.execute_raw("addExpense", &args).await;
        }
        let total = registry
            .execute_raw("getTotalExpense", r#"{"from": "2030-01-01", "to": "2030-01-02"}"#)
            .await;
        assert_eq!(total, "18200.5 INR");
    }

    #[tokio::test]
    async fn test_huge_amounts_never_break_the_totals() {
        let book = FinanceBook::shared();
        let registry = finance_tools(&book).unwrap();
        let big = r#"{"name": "Big", "amount": 7e28}"#;

        let first = registry.execute_raw("addExpense", big).await;
        assert_eq!(
            first,
            "Added expense: Big - 70000000000000000000000000000 INR to the database."
        );
        let second = registry.execute_raw("addExpense", big).await;
        assert!(second.starts_with("Error: Cannot add this expense"));

        assert_eq!(
            registry.execute_raw("getTotalExpense", "{}").await,
            "70000000000000000000000000000 INR"
        );

        registry.execute_raw("addIncome", big).await;
        registry.execute_raw("addIncome", big).await;
        assert_eq!(registry.execute_raw("getMoneyBalance", "{}").await, "0 INR");
    }

    #[tokio::test]
    async fn test_total_ignores_range_of_any_shape() {
        let book = FinanceBook::shared();
        let registry = finance_tools(&book).unwrap();
        registry
            .execute_raw("addExpense", r#"{"name": "Lunch", "amount": 100}"#)
            .await;

        for range in [
            r#"{"from": 20240101, "to": null}"#,
            r#"{"from": {"year": 2024}, "to": [1, 31]}"#,
            r#"{"from": true}"#,
            "",
        ] {
            assert_eq!(registry.execute_raw("getTotalExpense", range).await, "100 INR");
        }
    }

    #[test]
    fn test_system_prompt_mentions_time_and_currency() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let prompt = system_prompt(now);
        assert!(prompt.contains("Sun, 18 Oct 2026 09:30:00 GMT"));
        assert!(prompt.contains("INR"));
        assert!(prompt.contains("getMoneyBalance"));
    }
}
