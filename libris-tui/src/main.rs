//! LIBRIS TUI entry point.

use crossterm::{
    event::{self, Event as CrosstermEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use libris_core::CatalogSource;
use libris_storage::{
    persist_client, restore_client, spawn_persist_task, CacheConfig, LmdbPersister,
    PersistOptions, Persister, QueryClient,
};
use libris_tui::api_client::OpenLibraryClient;
use libris_tui::config::LibrisConfig;
use libris_tui::error::TuiError;
use libris_tui::events::TuiEvent;
use libris_tui::keys::map_key;
use libris_tui::notifications::NotificationLevel;
use libris_tui::queries::{install_book_defaults, BookQueries};
use libris_tui::state::App;
use libris_tui::telemetry;
use libris_tui::views::render_view;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast::error::RecvError, mpsc};

#[tokio::main]
async fn main() -> Result<(), TuiError> {
    let config = LibrisConfig::load()?;
    telemetry::init_tracing(&config)?;

    let client = QueryClient::new(
        CacheConfig::new()
            .with_stale_time(config.cache.stale_time())
            .with_gc_time(config.cache.gc_time()),
    );
    install_book_defaults(&client, config.cache.stale_time())?;

    let catalog: Arc<dyn CatalogSource> = Arc::new(OpenLibraryClient::new(&config)?);
    let queries =
        BookQueries::new(catalog).with_author_stale_time(config.cache.author_stale_time());

    let persist_options = PersistOptions::default()
        .with_max_age(config.persist.max_age())
        .with_throttle(config.persist.throttle())
        .with_buster(config.persist.buster.clone());
    let persister = open_persister(&config);

    let mut restored = 0;
    let mut warning = None;
    if let Some(persister) = &persister {
        match restore_client(&client, persister.as_ref(), &persist_options).await {
            Ok(count) => restored = count,
            Err(err) => {
                tracing::warn!(error = %err, "Cache restore failed");
                warning = Some(format!("Cache restore failed: {}", err));
            }
        }
    } else if config.persist.enabled {
        warning = Some("Cache persistence unavailable, starting cold".to_string());
    }
    let persist_task = persister.as_ref().map(|persister| {
        spawn_persist_task(client.clone(), Arc::clone(persister), persist_options.clone())
    });

    let mut app = App::new(client.clone(), queries);
    if restored > 0 {
        app.notify(
            NotificationLevel::Info,
            format!("Restored {} cached queries", restored),
        );
    }
    if let Some(message) = warning {
        app.notify(NotificationLevel::Warning, message);
    }
    app.sync();

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard {};

    let (event_tx, mut event_rx) = mpsc::channel::<TuiEvent>(256);
    spawn_input_reader(event_tx);
    let mut cache_events = client.subscribe_events();
    let mut ticker = tokio::time::interval(config.tick_rate());

    loop {
        terminal.draw(|f| render_view(f, &app))?;

        tokio::select! {
            _ = ticker.tick() => handle_event(&mut app, TuiEvent::Tick),
            Some(event) = event_rx.recv() => handle_event(&mut app, event),
            event = cache_events.recv() => match event {
                Ok(event) => handle_event(&mut app, TuiEvent::Cache(event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "UI lagged behind cache events");
                    app.sync();
                }
                Err(RecvError::Closed) => break,
            },
        }

        if app.should_quit {
            break;
        }
    }

    if let Some(task) = persist_task {
        task.abort();
    }
    if let Some(persister) = &persister {
        if let Err(err) = persist_client(&client, persister.as_ref(), &persist_options).await {
            tracing::warn!(error = %err, "Final cache snapshot failed");
        }
    }
    tracing::info!("Shutting down");

    Ok(())
}

/// Persistence is best effort: without a store the app still runs, it just
/// starts cold next time.
fn open_persister(config: &LibrisConfig) -> Option<Arc<dyn Persister>> {
    if !config.persist.enabled {
        return None;
    }
    match LmdbPersister::open(&config.store_path, config.persist.max_size_mb) {
        Ok(persister) => Some(Arc::new(persister)),
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %config.store_path.display(),
                "Cache persistence disabled"
            );
            None
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

fn spawn_input_reader(sender: mpsc::Sender<TuiEvent>) {
    std::thread::spawn(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(200)) {
            if let Ok(evt) = event::read() {
                let sent = match evt {
                    CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                        sender.blocking_send(TuiEvent::Input(key))
                    }
                    CrosstermEvent::Resize(width, height) => {
                        sender.blocking_send(TuiEvent::Resize { width, height })
                    }
                    _ => Ok(()),
                };
                if sent.is_err() {
                    break;
                }
            }
        }
    });
}

fn handle_event(app: &mut App, event: TuiEvent) {
    match event {
        TuiEvent::Input(key) => {
            if let Some(action) = map_key(key, app.screen, app.focus) {
                app.apply(action);
            }
        }
        TuiEvent::Cache(event) => app.on_cache_event(&event),
        TuiEvent::Tick => app.on_tick(),
        TuiEvent::Resize { .. } => {}
    }
}
