mod app;
mod commands;
mod config;
mod render;
mod theme;

use std::path::PathBuf;

use anyhow::{Context, Result};
use app::{Flow, ViewerApp};
use clap::Parser;
use config::{load_settings, DEFAULT_CONFIG_FILE};
use shared::domain::RoutineId;
use storage::{Fixture, MemoryStore};
use theme::{initial_theme, system_theme, ThemeMode, ThemeStore};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::{RecvError, TryRecvError},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Weekly class timetable viewer")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Routine fixture to seed the store with.
    #[arg(long)]
    fixture: Option<PathBuf>,
    /// Class id to select on start.
    #[arg(long)]
    routine: Option<String>,
    /// Theme for this session only; not persisted.
    #[arg(long)]
    theme: Option<ThemeMode>,
    /// Print one frame and exit.
    #[arg(long)]
    once: bool,
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config);
    if let Some(fixture) = args.fixture {
        settings.fixture_path = fixture;
    }
    if args.no_color {
        settings.color = false;
    }

    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let fixture = Fixture::load(&settings.fixture_path)?;
    info!(
        "viewer: loaded fixture path={} routines={}",
        settings.fixture_path.display(),
        fixture.routines.len()
    );

    let theme_store = ThemeStore::new(settings.theme_file.clone());
    let colorfgbg = std::env::var("COLORFGBG").ok();
    let theme = args.theme.unwrap_or_else(|| {
        initial_theme(
            theme_store.load(),
            system_theme(colorfgbg.as_deref(), settings.system_theme),
        )
    });
    info!(
        "viewer: theme={theme} theme_file={}",
        theme_store
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "-".into())
    );

    let mut app = ViewerApp::new(
        MemoryStore::from_fixture(&fixture),
        settings.fixture_path.clone(),
        theme,
        theme_store,
        settings.color,
    );
    let mut events = app.client().subscribe_events();
    app.client().start();

    if let Some(routine) = &args.routine {
        app.client()
            .select_routine(&RoutineId::new(routine.as_str()))
            .with_context(|| format!("cannot select class '{routine}'"))?;
    }

    if args.once {
        print!("{}", app.frame());
        app.shutdown();
        return Ok(());
    }

    println!("{}", app.frame());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if app.handle_line(&line) == Flow::Quit {
                    break;
                }
                drain_events(&mut app, &mut events);
            }
            event = events.recv() => {
                match event {
                    Ok(event) => app.on_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("viewer: event receiver lagged skipped={skipped}");
                    }
                    Err(RecvError::Closed) => break,
                }
                drain_events(&mut app, &mut events);
            }
        }
        println!("{}", app.frame());
    }

    app.shutdown();
    Ok(())
}

/// Folds every queued event into the app so a burst redraws once.
fn drain_events(
    app: &mut ViewerApp,
    events: &mut tokio::sync::broadcast::Receiver<client_core::ClientEvent>,
) {
    loop {
        match events.try_recv() {
            Ok(event) => app.on_event(&event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("viewer: event receiver lagged skipped={skipped}");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}
