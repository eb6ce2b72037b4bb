//! Viewer state between frames: the client, the seeded store behind it and the
//! presentation preferences.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::Datelike;
use client_core::{ClientEvent, TimetableClient};
use shared::domain::DayKey;
use storage::{Fixture, MemoryStore};
use tracing::{info, warn};

use crate::{
    commands::{parse_command, resolve_routine, ViewerCommand, HELP_TEXT},
    render::{render_frame, Palette},
    theme::{ThemeMode, ThemeStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct ViewerApp {
    client: TimetableClient,
    store: MemoryStore,
    fixture_path: PathBuf,
    theme: ThemeMode,
    theme_store: ThemeStore,
    color: bool,
    status: Option<String>,
}

impl ViewerApp {
    pub fn new(
        store: MemoryStore,
        fixture_path: PathBuf,
        theme: ThemeMode,
        theme_store: ThemeStore,
        color: bool,
    ) -> Self {
        let client = TimetableClient::new(Arc::new(store.clone()));
        Self {
            client,
            store,
            fixture_path,
            theme,
            theme_store,
            color,
            status: None,
        }
    }

    pub fn client(&self) -> &TimetableClient {
        &self.client
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Parses and runs one prompt line. Failures end up in the status line.
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(err) => {
                self.set_status(err.to_string());
                return Flow::Continue;
            }
        };
        match self.handle(command) {
            Ok(flow) => flow,
            Err(err) => {
                warn!("viewer: command failed err={err:#}");
                self.set_status(format!("error: {err:#}"));
                Flow::Continue
            }
        }
    }

    pub fn handle(&mut self, command: ViewerCommand) -> Result<Flow> {
        self.status = None;
        match command {
            ViewerCommand::List => {
                let routines = self.client.routines();
                if routines.is_empty() {
                    self.set_status("no classes available");
                } else {
                    let lines: Vec<String> = routines
                        .iter()
                        .map(|routine| format!("  {:<12} {}", routine.id, routine.label()))
                        .collect();
                    self.set_status(format!("classes:\n{}", lines.join("\n")));
                }
            }
            ViewerCommand::Select { query } => {
                if self.selector_disabled() {
                    return Ok(Flow::Continue);
                }
                let routines = self.client.routines();
                let routine = resolve_routine(&query, &routines)?;
                self.client.select_routine(&routine.id)?;
            }
            ViewerCommand::Clear => {
                if self.selector_disabled() {
                    return Ok(Flow::Continue);
                }
                self.client.clear_selection();
            }
            ViewerCommand::Reload => {
                let fixture = Fixture::load(&self.fixture_path)?;
                info!(
                    "viewer: reloading fixture path={} routines={}",
                    self.fixture_path.display(),
                    fixture.routines.len()
                );
                self.store.apply_fixture(&fixture);
                self.set_status(format!("reloaded {} classes", fixture.routines.len()));
            }
            ViewerCommand::Offline => self.client.set_offline(true),
            ViewerCommand::Online => self.client.set_offline(false),
            ViewerCommand::Theme => {
                self.theme = self.theme.toggled();
                self.theme_store.save(self.theme)?;
                self.set_status(format!("theme: {}", self.theme));
            }
            ViewerCommand::Help => self.set_status(HELP_TEXT),
            ViewerCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn selector_disabled(&mut self) -> bool {
        let loading = self.client.assembler().is_loading();
        if loading {
            self.set_status("the class selector is disabled while the schedule loads");
        }
        loading
    }

    /// Status updates for events the frame alone would not explain.
    pub fn on_event(&mut self, event: &ClientEvent) {
        if let ClientEvent::Error(message) = event {
            self.set_status(format!("error: {message}"));
        }
    }

    pub fn frame(&self) -> String {
        let today = DayKey::from_weekday(chrono::Local::now().weekday());
        render_frame(
            &self.client.snapshot(),
            today,
            &Palette::for_theme(self.theme(), self.color),
            self.status.as_deref(),
        )
    }

    pub fn shutdown(&self) {
        self.client.shutdown();
    }
}
