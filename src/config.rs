use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::auth::FileTokenStore;

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub invoice_dir: PathBuf,
    pub session_file: PathBuf,
    pub log_file: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./billing.db".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .context("BIND_ADDR must be host:port")?;

        Ok(Self {
            database_url,
            bind_addr,
            invoice_dir: path_var("INVOICE_DIR").unwrap_or_else(|| PathBuf::from("./invoices")),
            session_file: path_var("SESSION_FILE").unwrap_or_else(FileTokenStore::default_path),
            log_file: path_var("LOG_FILE")
                .unwrap_or_else(|| PathBuf::from("apartment-billing.log")),
        })
    }
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
