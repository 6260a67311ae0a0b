//! TUI front-end (Ratatui + Crossterm)
//! - Public screens: payment lookup by apartment, invoice by apartment and period
//! - Admin dashboard behind the auth gate: payments and expenses
//! - Talks to the SQLite store directly through [`api::Client`]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::auth::{AuthGate, FileTokenStore, SqlIdentityProvider};
use crate::config::AppConfig;
use crate::database::RecordStore;

pub mod api;
pub mod input;
pub mod retry;
pub mod state;
pub mod ui;
pub mod util;

pub async fn run(config: &AppConfig, pool: Pool<Sqlite>) -> Result<()> {
    let mut app = init_app(config, pool);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    info!("tui closed");
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut state::App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key).await?;
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.quit {
            return Ok(());
        }
    }
}

pub fn init_app(config: &AppConfig, pool: Pool<Sqlite>) -> state::App {
    let identity = Arc::new(SqlIdentityProvider::new(pool.clone()));
    let tokens = Arc::new(FileTokenStore::new(&config.session_file));
    let gate = AuthGate::new(identity, tokens);

    let client = api::Client::new(RecordStore::new(pool), gate, &config.invoice_dir);
    state::App::new(client)
}
