// src/main.rs
use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};
use dotenvy::dotenv;
use tracing::info;

use apartment_billing::auth::SqlIdentityProvider;
use apartment_billing::backend::{self, AppState};
use apartment_billing::config::AppConfig;
use apartment_billing::database::db::{connection, migrate};
use apartment_billing::database::RecordStore;
use apartment_billing::{cli, logging};

const USAGE: &str = "usage: apartment-billing [tui | server | add-admin <email> <password>]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = AppConfig::from_env()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("tui");

    match command {
        "tui" => logging::init_file(&config.log_file)
            .with_context(|| format!("cannot open log file {}", config.log_file.display()))?,
        "server" | "add-admin" => logging::init_stderr(),
        "help" | "-h" | "--help" => {
            println!("{USAGE}");
            return Ok(());
        }
        other => bail!("unknown command `{other}`\n{USAGE}"),
    }

    let pool = connection::get_db_pool(&config.database_url).await?;
    migrate::run_migrations(&pool).await?;

    match command {
        "server" => {
            let identity = Arc::new(SqlIdentityProvider::new(pool.clone()));
            let state = AppState::new(RecordStore::new(pool), identity);
            backend::run_server(state, config.bind_addr).await?;
        }
        "add-admin" => {
            let (Some(email), Some(password)) = (args.get(1), args.get(2)) else {
                bail!("{USAGE}");
            };
            SqlIdentityProvider::new(pool).create_admin(email, password).await?;
            info!(%email, "admin account ready");
        }
        _ => cli::run(&config, pool).await?,
    }
    Ok(())
}
