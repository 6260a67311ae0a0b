use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, Once};

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("apartment_billing=info"))
}

/// Logs to stderr. Used by the HTTP server and one-shot commands.
pub fn init_stderr() {
    TRACING_INIT.call_once(|| {
        fmt().with_env_filter(filter()).with_writer(std::io::stderr).init();
    });
}

/// Logs to `path`, leaving the terminal to the TUI.
pub fn init_file(path: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    TRACING_INIT.call_once(|| {
        fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    });
    Ok(())
}
