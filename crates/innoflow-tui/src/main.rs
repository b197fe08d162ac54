use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use innoflow_service::HttpService;
use innoflow_tui::app::App;
use innoflow_tui::config::Config;
use innoflow_tui::logging::init_logging;
use ratatui::prelude::*;

const FRAME_POLL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let config = Config::parse();
    let settings = config.settings()?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let (log_path, _log_guard) = init_logging()?;
    tracing::info!(
        server = %config.server_url,
        log = %log_path.display(),
        "starting innoflow"
    );

    let api = Arc::new(HttpService::new(&config.server_url));
    let result = run_tui(App::new(api, settings)?);
    if let Err(ref e) = result {
        tracing::error!(error = %e, "terminal loop failed");
    }
    result
}

fn run_tui(app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        eprintln!("Error: {e}");
    }

    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        app.tick();
        app.pump();
        terminal.draw(|frame| app.render(frame))?;

        // Responses and the debounce timer need frames even without input
        if !event::poll(FRAME_POLL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            // Ctrl+C always quits
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }
            // q quits unless we're in an input mode
            if key.code == KeyCode::Char('q') && !app.is_input_mode() {
                break;
            }
            app.handle_key(key);
        }
    }

    Ok(())
}
