//! Service Kit - Agent Tools
//!
//! Finance tools that implement `agent_core::Tool` over a shared book.

mod record_entry;
mod total_expense;
mod money_balance;

pub use record_entry::RecordEntryTool;
pub use total_expense::TotalExpenseTool;
pub use money_balance::MoneyBalanceTool;
