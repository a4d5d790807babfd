//! Runtime configuration
//!
//! Options come from command-line flags with environment variables taking
//! precedence; both are resolved exactly once at startup.

use clap::Parser;

/// Loyalty points backend configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "loyalty-broker", about = "Loyalty points backend")]
pub struct Config {
    /// Address to serve the API on
    #[arg(short = 'a', long = "address", default_value = ":8080")]
    pub run_address: String,

    /// Database location (SQLite path)
    #[arg(short = 'd', long = "database", default_value = "")]
    pub database_uri: String,

    /// Base URL of the accrual system
    #[arg(short = 'r', long = "accrual", default_value = "http://localhost:8181")]
    pub accrual_address: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long = "log-level", default_value = "debug")]
    pub log_level: String,
}

impl Config {
    /// Parse flags, then let the environment override them.
    pub fn load() -> Self {
        let mut cfg = Self::parse();
        cfg.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        cfg
    }

    fn apply_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = get("RUN_ADDRESS") {
            self.run_address = addr;
        }
        if let Some(dsn) = get("DATABASE_URI") {
            self.database_uri = dsn;
        }
        if let Some(accrual) = get("ACCRUAL_SYSTEM_ADDRESS") {
            self.accrual_address = accrual;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Bindable socket address. A bare `:port` listens on all interfaces.
    pub fn listen_addr(&self) -> String {
        if self.run_address.starts_with(':') {
            format!("0.0.0.0{}", self.run_address)
        } else {
            self.run_address.clone()
        }
    }

    /// Filter directive for the tracing subscriber.
    pub fn log_filter(&self) -> String {
        format!(
            "loyalty_broker={level},tower_http={level}",
            level = self.log_level
        )
    }
}
