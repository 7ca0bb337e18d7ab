mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod model;
mod theme;
mod tui;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::app::App;
use crate::config::{AppConfig, GeneralConfig, TreeConfig, WatcherConfig};
use crate::event::{Event, EventHandler};
use crate::fs::watcher::{FsWatcher, DEFAULT_FLOOD_THRESHOLD};
use crate::tui::{install_panic_hook, Tui};

/// A terminal tree browser with live filesystem updates.
#[derive(Parser, Debug)]
#[command(name = "treefm", version, about)]
struct Cli {
    /// Root path to display (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,

    /// Show hidden files
    #[arg(long)]
    show_hidden: bool,

    /// Sort attribute: name, size, type, date_modified
    #[arg(long)]
    sort_by: Option<String>,
}

impl Cli {
    /// Partial config carrying only the flags the user actually passed.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: self.show_hidden.then_some(true),
                ..Default::default()
            },
            tree: TreeConfig {
                sort_by: self.sort_by.clone(),
                ..Default::default()
            },
            watcher: WatcherConfig {
                enabled: self.no_watcher.then_some(false),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    let path = cli.path.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", cli.path.display()))
    })?;

    install_panic_hook(config.mouse_enabled());

    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let event_tx = events.sender();
    let mut app = App::new(&path, &config, event_tx.clone())?;
    let theme = theme::resolve_theme(&config.theme);

    // Initialize filesystem watcher (unless disabled)
    let _watcher = if !config.watcher_enabled() {
        app.watcher_active = false;
        None
    } else {
        match FsWatcher::new(
            &path,
            Duration::from_millis(config.debounce_ms()),
            config.watcher_ignore(),
            DEFAULT_FLOOD_THRESHOLD,
            event_tx.clone(),
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                app.watcher_active = false;
                app.set_status_message(format!("⚠ Watcher unavailable: {}", e));
                None
            }
        }
    };

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, &theme, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(_) => {}
            Event::Tick => app.clear_expired_status(),
            Event::Resize(_, _) => {}
            Event::EntriesLoaded { scope, entries } => app.handle_entries_loaded(scope, entries),
            Event::ScopeLoaded(scope) => app.handle_scope_loaded(scope),
            Event::FsChange(paths) => {
                if app.watcher_active {
                    app.handle_fs_change(paths);
                }
            }
        }

        // Sync watcher pause/resume state
        if let Some(ref watcher) = _watcher {
            if app.watcher_active && !watcher.is_active() {
                watcher.resume();
            } else if !app.watcher_active && watcher.is_active() {
                watcher.pause();
            }
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    Ok(())
}
