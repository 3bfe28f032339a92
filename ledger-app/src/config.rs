//! Configuration loading from the environment and command line.

use std::time::Duration;

use clap::Parser;
use ledger_repo::RepoOptions;

/// Application configuration.
///
/// Every option can be set by flag or by environment variable; `.env` is
/// loaded before parsing.
#[derive(Debug, Parser)]
#[command(name = "ledger-server", version, about = "Double-entry transfer ledger server")]
pub struct Config {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Database connection string (postgres:// or sqlite://)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Deadline for a whole transfer, in milliseconds
    #[arg(long, env = "TRANSFER_TIMEOUT_MS", default_value_t = 5000)]
    pub transfer_timeout_ms: u64,

    /// How long a transaction waits for a row lock, in milliseconds
    #[arg(long, env = "LOCK_TIMEOUT_MS", default_value_t = 3000)]
    pub lock_timeout_ms: u64,

    /// Maximum pooled database connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    pub fn repo_options(&self) -> RepoOptions {
        RepoOptions {
            max_connections: self.db_max_connections,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            ..RepoOptions::default()
        }
    }

    /// Connection string with any password masked, for logging.
    pub fn redacted_database_url(&self) -> String {
        match (self.database_url.find("://"), self.database_url.rfind('@')) {
            (Some(scheme), Some(at)) if at > scheme => {
                let credentials = &self.database_url[scheme + 3..at];
                match credentials.split_once(':') {
                    Some((user, _)) => format!(
                        "{}{}:***{}",
                        &self.database_url[..scheme + 3],
                        user,
                        &self.database_url[at..]
                    ),
                    None => self.database_url.clone(),
                }
            }
            _ => self.database_url.clone(),
        }
    }
}
