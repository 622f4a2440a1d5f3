use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    Terminal,
};
use std::io;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod app;
mod compare;
mod config;
mod db;
mod diff;
mod error;
mod events;
mod sqlgen;
mod syntax;
mod ui;

use app::{App, AppMode};
use compare::Side;
use config::Config;
use events::{AppEvent, EventHandler};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    // Load saved config before the terminal is taken over
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => {
            tracing::warn!(error = %e, "using default config");
            (Config::default(), Some(format!("{:#}", e)))
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender());
    if let Some(err) = config_error {
        app.set_error(err);
    }

    // Run app
    let res = run_app(&mut terminal, &mut app, &mut events);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "exiting with error");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging() {
    let Ok(path) = Config::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vibeops_schema=info"));
    let _ = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(filter)
        .try_init();
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        match events.next()? {
            AppEvent::Fetched(outcome) => app.apply_fetch(outcome),
            AppEvent::Input(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                let quit = match app.mode {
                    AppMode::ConnectionSelector => handle_selector_input(app, key.code),
                    AppMode::ConnectionEdit => handle_connection_input(app, key.code),
                    AppMode::Compare => handle_compare_input(app, key.code),
                    AppMode::Migration => handle_migration_input(app, key.code),
                };
                if quit {
                    return Ok(());
                }
            }
            AppEvent::Input(_) | AppEvent::Tick => {}
        }
    }
}

fn handle_selector_input(app: &mut App, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => return true,
        KeyCode::Up => app.selector_up(),
        KeyCode::Down => app.selector_down(),
        KeyCode::Char('s') | KeyCode::Enter => app.assign_selected_profile(Side::Source),
        KeyCode::Char('t') => app.assign_selected_profile(Side::Target),
        KeyCode::Char('n') => app.create_new_connection(Side::Source),
        KeyCode::Char('N') => app.create_new_connection(Side::Target),
        KeyCode::Char('d') => {
            if let Err(e) = app.delete_selected_profile() {
                app.set_error(format!("Failed to delete profile: {}", e));
            }
        }
        KeyCode::Char('c') => {
            app.run_compare();
        }
        KeyCode::Tab => app.mode = AppMode::Compare,
        _ => {}
    }
    false
}

fn handle_connection_input(app: &mut App, key: KeyCode) -> bool {
    match key {
        KeyCode::Esc => {
            app.key.clear();
            app.mode = AppMode::ConnectionSelector;
        }
        KeyCode::Tab => app.next_connection_field(),
        KeyCode::BackTab => app.prev_connection_field(),
        KeyCode::Enter => {
            if let Err(e) = app.submit_connection() {
                app.set_error(format!("{:#}", e));
            }
        }
        KeyCode::Char(c) => app.input_char(c),
        KeyCode::Backspace => app.delete_char(),
        _ => {}
    }
    false
}

fn handle_compare_input(app: &mut App, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') => return true,
        KeyCode::Up => app.diff_up(),
        KeyCode::Down => app.diff_down(),
        KeyCode::Char('r') => {
            app.run_compare();
        }
        KeyCode::Char('g') => {
            app.generate_migration();
        }
        KeyCode::Tab | KeyCode::Esc => app.mode = AppMode::ConnectionSelector,
        _ => {}
    }
    false
}

fn handle_migration_input(app: &mut App, key: KeyCode) -> bool {
    match key {
        KeyCode::Char('q') => return true,
        KeyCode::Up => app.scroll_migration(-1),
        KeyCode::Down => app.scroll_migration(1),
        KeyCode::PageUp => app.scroll_migration(-20),
        KeyCode::PageDown => app.scroll_migration(20),
        KeyCode::Char('w') => match app.export_migration() {
            Ok(path) => app.set_status(format!("Saved {}", path.display())),
            Err(e) => app.set_error(format!("{:#}", e)),
        },
        KeyCode::Esc | KeyCode::Tab => app.mode = AppMode::Compare,
        _ => {}
    }
    false
}
