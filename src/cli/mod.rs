//! TUI front-end entry (Ratatui + Crossterm)
//! - Opens the local session store and the backend client
//! - Resolves the session before the first interactive frame
//! - Sets up terminal and runs the event loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use crate::config::AppConfig;
use crate::database::SessionStore;
use crate::remote::{BackendHttp, PersistedAuth};
use crate::runtime::AppRuntime;

pub mod input;
pub mod state;
pub mod ui;
pub mod util;

pub async fn run(config: AppConfig) -> Result<()> {
    let rt = Arc::new(init_runtime(&config).await?);
    let mut app = state::App::new(Arc::clone(&rt), config.currency.clone());

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &rt, &config).await;

    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    rt.shutdown();
    info!("exiting");
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut state::App,
    rt: &Arc<AppRuntime>,
    config: &AppConfig,
) -> Result<()> {
    // Nothing renders past the loading frame until the session is resolved.
    terminal.draw(|f| ui::draw(f, app))?;
    rt.start().await;
    let _refresh = rt.session.spawn_refresh(config.refresh_margin);
    app.sync_session().await;

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
            // Background refresh may have signed the user out.
            app.sync_session().await;
            last_tick = Instant::now();
        }

        if app.quit {
            break;
        }
    }
    Ok(())
}

pub async fn init_runtime(config: &AppConfig) -> Result<AppRuntime> {
    let store = SessionStore::open(&config.database_url)
        .await
        .with_context(|| format!("opening session store at {}", config.database_url))?;
    let http = BackendHttp::from_config(config).context("backend client")?;
    let auth = Arc::new(PersistedAuth::new(http.clone(), store, config.refresh_margin));
    Ok(AppRuntime::new(auth, Arc::new(http), config.session_resolve_timeout))
}
