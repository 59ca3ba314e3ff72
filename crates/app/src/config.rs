use clap::{Parser, Subcommand};
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/fintrack.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// JSON file the session token is persisted in.
    pub token_path: String,
    pub timeout_secs: u64,
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            token_path: "config/fintrack_session.json".to_string(),
            timeout_secs: 30,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "fintrack", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://localhost:8000/api).
    #[arg(long)]
    base_url: Option<String>,
    /// Override the session token file.
    #[arg(long)]
    token_path: Option<String>,
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in and store the session token. The password is read from
    /// FINTRACK_PASSWORD or stdin, never from the command line.
    Login { username: String },
    /// Forget the stored session token.
    Logout,
    /// Create an account.
    Register {
        username: String,
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Monthly overview, predictions and spending insights.
    Dashboard,
    /// List transactions.
    Transactions {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        ordering: Option<String>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Record an income or an expense.
    AddTransaction {
        /// `income` or `expense`.
        kind: String,
        amount: f64,
        description: String,
        /// YYYY-MM-DD, defaults to today.
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        category: Option<u64>,
    },
    Categories,
    Budgets,
    /// Change the amount of a budget.
    SetBudget { id: u64, amount: f64 },
    Goals,
    /// Update how much has been saved toward a goal.
    SetGoal { id: u64, current_amount: f64 },
}

pub fn load() -> Result<(AppConfig, Command)> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("FINTRACK"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(token_path) = args.token_path {
        settings.token_path = token_path;
    }
    if let Some(level) = args.level {
        settings.level = level;
    }

    Ok((settings, args.command))
}
