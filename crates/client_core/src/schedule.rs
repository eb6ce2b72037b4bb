//! Weekly schedule index and the grid derived from it.

use std::collections::BTreeMap;

use serde::Serialize;
use shared::domain::{DayKey, TimeSlot, LUNCH_BREAK_LABEL, TIME_SLOTS};

use crate::record::{compare_periods, PeriodCell, PeriodRecord};

/// Day key -> period records sorted ascending by period number.
///
/// Updates are functional: [`ScheduleIndex::with_day`] returns a new index in
/// which only that day's slice differs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScheduleIndex {
    days: BTreeMap<DayKey, Vec<PeriodRecord>>,
}

impl ScheduleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(&self, day: DayKey, mut records: Vec<PeriodRecord>) -> Self {
        records.sort_by(compare_periods);
        let mut days = self.days.clone();
        days.insert(day, records);
        Self { days }
    }

    pub fn day(&self, day: DayKey) -> Option<&[PeriodRecord]> {
        self.days.get(&day).map(Vec::as_slice)
    }

    pub fn reported_days(&self) -> impl Iterator<Item = DayKey> + '_ {
        self.days.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn find(&self, day: DayKey, period: u32) -> Option<&PeriodRecord> {
        self.day(day)?
            .iter()
            .find(|record| record.period_number == Some(i64::from(period)))
    }

    /// Lunch slots never consult the index.
    pub fn cell(&self, day: DayKey, slot: &TimeSlot) -> GridCell {
        if slot.is_lunch {
            return GridCell::Lunch;
        }
        match self.find(day, slot.period) {
            Some(record) => GridCell::Period(record.cell()),
            None => GridCell::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "period", rename_all = "snake_case")]
pub enum GridCell {
    Lunch,
    Empty,
    Period(PeriodCell),
}

impl GridCell {
    pub fn lunch_label() -> &'static str {
        LUNCH_BREAK_LABEL
    }

    /// True when the cell renders as the dash placeholder. A period without a
    /// resolvable subject counts, whatever its other fields say.
    pub fn is_placeholder(&self) -> bool {
        match self {
            GridCell::Lunch => false,
            GridCell::Empty => true,
            GridCell::Period(cell) => cell.subject.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub day: DayKey,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyGrid {
    pub slots: Vec<TimeSlot>,
    pub rows: Vec<GridRow>,
}

impl WeeklyGrid {
    pub fn build(index: &ScheduleIndex) -> Self {
        let rows = DayKey::ALL
            .into_iter()
            .map(|day| GridRow {
                day,
                cells: TIME_SLOTS.iter().map(|slot| index.cell(day, slot)).collect(),
            })
            .collect();
        Self {
            slots: TIME_SLOTS.to_vec(),
            rows,
        }
    }

    pub fn row(&self, day: DayKey) -> Option<&GridRow> {
        self.rows.iter().find(|row| row.day == day)
    }
}

#[cfg(test)]
#[path = "tests/schedule_tests.rs"]
mod tests;
