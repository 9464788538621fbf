//! FinAI terminal assistant
//!
//! Talks to a Groq-hosted model over stdin/stdout and keeps an in-memory
//! expense and income ledger through tool calls.

mod config;
mod driver;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentBuilder, LlmProvider, Session};
use agent_runtime::GroqProvider;
use finance_ledger::{FinanceBook, finance_tools, system_prompt};

use crate::config::CliConfig;
use crate::driver::SessionDriver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Logs go to stderr so the conversation on stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Nothing is created until the credential is known to be present
    let config = CliConfig::from_env().context("FinAI cannot start")?;

    let provider = Arc::new(GroqProvider::from_config(config.groq.clone())?);

    match provider.health_check().await {
        Ok(true) => tracing::info!(base_url = %config.groq.base_url, "Connected to Groq"),
        Ok(false) | Err(_) => {
            tracing::warn!(base_url = %config.groq.base_url, "Groq not reachable, turns will fail until it is");
        }
    }

    let book = FinanceBook::shared();
    let tools = finance_tools(&book)?;
    tracing::info!(tools = ?tools.names(), "Registered tools");

    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(tools)
        .model(config.model.clone())
        .temperature(config.temperature)
        .request_timeout(config.request_timeout)
        .max_rounds(config.max_rounds)
        .build()?;

    let session = Session::new(system_prompt(chrono::Utc::now()));
    let mut driver = SessionDriver::new(agent, session);

    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = driver.run(stdin, tokio::io::stdout()).await {
        tracing::error!(error = %e, session = %driver.session().id, "Session ended on I/O error");
    }

    Ok(())
}
