//! Text rendering of one view frame.

use std::fmt::Write as _;

use client_core::{GridCell, ViewSnapshot, WeeklyGrid};
use shared::domain::{DayKey, LUNCH_BREAK_LABEL};

use crate::theme::ThemeMode;

const MAX_CELL_WIDTH: usize = 18;
const DAY_HEADER: &str = "Day / Time";
const TODAY_MARK: &str = " *";
const EMPTY_CELL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub heading: &'static str,
    pub subject: &'static str,
    pub muted: &'static str,
    pub lunch: &'static str,
    pub alert: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn plain() -> Self {
        Self {
            heading: "",
            subject: "",
            muted: "",
            lunch: "",
            alert: "",
            reset: "",
        }
    }

    pub fn for_theme(mode: ThemeMode, color: bool) -> Self {
        if !color {
            return Self::plain();
        }
        match mode {
            ThemeMode::Light => Self {
                heading: "\x1b[1;34m",
                subject: "\x1b[1;30m",
                muted: "\x1b[90m",
                lunch: "\x1b[33m",
                alert: "\x1b[1;31m",
                reset: "\x1b[0m",
            },
            ThemeMode::Dark => Self {
                heading: "\x1b[1;96m",
                subject: "\x1b[1;97m",
                muted: "\x1b[37m",
                lunch: "\x1b[93m",
                alert: "\x1b[1;91m",
                reset: "\x1b[0m",
            },
        }
    }

    fn paint(&self, style: &str, text: &str) -> String {
        if style.is_empty() {
            text.to_string()
        } else {
            format!("{style}{text}{}", self.reset)
        }
    }
}

/// Lines shown inside a grid cell, paired with the style they use.
fn cell_lines(cell: &GridCell) -> Vec<(String, CellStyle)> {
    match cell {
        GridCell::Lunch => vec![(LUNCH_BREAK_LABEL.to_string(), CellStyle::Lunch)],
        GridCell::Period(period) if !period.subject.is_empty() => {
            let mut lines = vec![(period.subject.clone(), CellStyle::Subject)];
            for detail in [&period.code, &period.teacher, &period.room] {
                if !detail.is_empty() {
                    lines.push((detail.clone(), CellStyle::Muted));
                }
            }
            lines
        }
        _ => vec![(EMPTY_CELL.to_string(), CellStyle::Muted)],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellStyle {
    Plain,
    Subject,
    Muted,
    Lunch,
}

impl CellStyle {
    fn code(self, palette: &Palette) -> &'static str {
        match self {
            CellStyle::Plain => "",
            CellStyle::Subject => palette.subject,
            CellStyle::Muted => palette.muted,
            CellStyle::Lunch => palette.lunch,
        }
    }
}

fn fit(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        return format!("{text}{}", " ".repeat(width - len));
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

fn separator(widths: &[usize], fill: char) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.extend(std::iter::repeat(fill).take(width + 2));
        line.push('+');
    }
    line
}

fn day_label(day: DayKey, today: Option<DayKey>) -> String {
    if today == Some(day) {
        format!("{}{TODAY_MARK}", day.display_name())
    } else {
        day.display_name().to_string()
    }
}

pub fn render_grid(grid: &WeeklyGrid, today: Option<DayKey>, palette: &Palette) -> String {
    let rows: Vec<(String, Vec<Vec<(String, CellStyle)>>)> = grid
        .rows
        .iter()
        .map(|row| {
            (
                day_label(row.day, today),
                row.cells.iter().map(cell_lines).collect(),
            )
        })
        .collect();

    let mut widths = Vec::with_capacity(grid.slots.len() + 1);
    widths.push(
        rows.iter()
            .map(|(label, _)| label.chars().count())
            .chain([DAY_HEADER.len()])
            .max()
            .unwrap_or(DAY_HEADER.len()),
    );
    for (column, slot) in grid.slots.iter().enumerate() {
        let content = rows
            .iter()
            .flat_map(|(_, cells)| cells[column].iter())
            .map(|(text, _)| text.chars().count())
            .max()
            .unwrap_or(0);
        widths.push(content.max(slot.time.chars().count()).min(MAX_CELL_WIDTH));
    }

    let mut out = String::new();
    let border = separator(&widths, '-');
    let _ = writeln!(out, "{border}");

    let mut header = String::from("|");
    let _ = write!(
        header,
        " {} |",
        palette.paint(palette.heading, &fit(DAY_HEADER, widths[0]))
    );
    for (slot, width) in grid.slots.iter().zip(&widths[1..]) {
        let style = if slot.is_lunch {
            palette.lunch
        } else {
            palette.heading
        };
        let _ = write!(header, " {} |", palette.paint(style, &fit(slot.time, *width)));
    }
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", separator(&widths, '='));

    for (label, cells) in &rows {
        let height = cells.iter().map(Vec::len).max().unwrap_or(1);
        for line_no in 0..height {
            let mut line = String::from("|");
            let day_text = if line_no == 0 { label.as_str() } else { "" };
            let day_style = if line_no == 0 && label.ends_with(TODAY_MARK) {
                palette.heading
            } else {
                CellStyle::Plain.code(palette)
            };
            let _ = write!(line, " {} |", palette.paint(day_style, &fit(day_text, widths[0])));
            for (cell, width) in cells.iter().zip(&widths[1..]) {
                let (text, style) = cell
                    .get(line_no)
                    .map(|(text, style)| (text.as_str(), *style))
                    .unwrap_or(("", CellStyle::Plain));
                let _ = write!(line, " {} |", palette.paint(style.code(palette), &fit(text, *width)));
            }
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out, "{border}");
    }

    out
}

fn render_offline_overlay(out: &mut String, palette: &Palette) {
    let lines = ["(x) You're offline", "Please check your network connection"];
    let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    let border = separator(&[width], '-');
    let _ = writeln!(out, "{border}");
    for line in lines {
        let _ = writeln!(out, "| {} |", palette.paint(palette.alert, &fit(line, width)));
    }
    let _ = writeln!(out, "{border}");
    let _ = writeln!(out);
}

/// Renders a full frame: header, selector, then loading / prompt / grid.
pub fn render_frame(
    snapshot: &ViewSnapshot,
    today: Option<DayKey>,
    palette: &Palette,
    status: Option<&str>,
) -> String {
    let mut out = String::new();

    if snapshot.offline {
        render_offline_overlay(&mut out, palette);
    }

    let _ = writeln!(out, "{}", palette.paint(palette.heading, "Uniroutine"));
    let _ = writeln!(out, "{}", palette.paint(palette.muted, "The universal routine manager"));
    let _ = writeln!(out);

    let selector = match &snapshot.selected {
        Some(routine) => routine.label().to_string(),
        None => palette.paint(palette.muted, "Select your class"),
    };
    let disabled = if snapshot.loading { " (disabled)" } else { "" };
    let _ = writeln!(out, "Select Class: [{selector}]{disabled}");
    let _ = writeln!(out);

    if snapshot.loading {
        let _ = writeln!(out, "{}", palette.paint(palette.muted, "Loading schedule…"));
    } else if let Some(routine) = &snapshot.selected {
        let _ = writeln!(out, "{}", palette.paint(palette.heading, routine.label()));
        out.push_str(&render_grid(&snapshot.grid(), today, palette));
        let _ = writeln!(
            out,
            "{}",
            palette.paint(
                palette.muted,
                "Please contact your HOD in case of any discrepancy"
            )
        );
    } else {
        let _ = writeln!(out, "{}", palette.paint(palette.heading, "Select your class first"));
        let _ = writeln!(
            out,
            "To view your class schedule, please select it from the list (type `list`, then `select <class>`)"
        );
    }

    if let Some(status) = status {
        let _ = writeln!(out);
        let _ = writeln!(out, "{status}");
    }

    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
