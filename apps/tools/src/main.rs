mod validate;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{GridCell, TimetableClient, WeeklyGrid};
use shared::domain::RoutineId;
use storage::{Fixture, MemoryStore};
use tracing_subscriber::EnvFilter;
use validate::{validate_fixture, Severity};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "data/routines.json", global = true)]
    fixture: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a fixture for periods the viewer would drop or misplace.
    Validate,
    Routines,
    Schedule {
        #[arg(long)]
        routine: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let fixture = Fixture::load(&cli.fixture)?;

    match cli.command {
        Command::Validate => {
            let issues = validate_fixture(&fixture);
            for issue in &issues {
                println!("{issue}");
            }
            let errors = issues
                .iter()
                .filter(|issue| issue.severity == Severity::Error)
                .count();
            println!(
                "checked routines={} issues={} errors={errors}",
                fixture.routines.len(),
                issues.len()
            );
            if errors > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Routines => {
            for routine in fixture.routine_list() {
                println!("{}\t{}", routine.id, routine.label());
            }
        }
        Command::Schedule { routine, json } => {
            let client = TimetableClient::new(Arc::new(MemoryStore::from_fixture(&fixture)));
            client.start();
            let selected = client
                .select_routine(&RoutineId::new(routine.as_str()))
                .with_context(|| format!("cannot assemble schedule for '{routine}'"))?;
            let snapshot = client.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot.schedule)?);
            } else {
                println!("{}", selected.label());
                print_grid(&snapshot.grid());
            }
            client.shutdown();
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_grid(grid: &WeeklyGrid) {
    for row in &grid.rows {
        println!("{}", row.day.display_name());
        for (slot, cell) in grid.slots.iter().zip(&row.cells) {
            let text = match cell {
                GridCell::Lunch => GridCell::lunch_label().to_string(),
                GridCell::Period(period) if !cell.is_placeholder() => {
                    let details: Vec<&str> = [&period.code, &period.teacher, &period.room]
                        .into_iter()
                        .map(String::as_str)
                        .filter(|detail| !detail.is_empty())
                        .collect();
                    if details.is_empty() {
                        period.subject.clone()
                    } else {
                        format!("{} ({})", period.subject, details.join(", "))
                    }
                }
                _ => "-".to_string(),
            };
            println!("  {}  {:<13}  {text}", slot.period, slot.time);
        }
    }
}
