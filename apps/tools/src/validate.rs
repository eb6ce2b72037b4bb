//! Fixture checks for data the viewer would silently drop or misplace.

use std::{collections::BTreeMap, fmt};

use client_core::record::{parse_period_number, SUBJECT_CHAIN};
use shared::domain::time_slot;
use storage::Fixture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub routine: String,
    pub day: String,
    pub period: Option<String>,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: routines/{}/{}", self.routine, self.day)?;
        if let Some(period) = &self.period {
            write!(f, "/{period}")?;
        }
        write!(f, ": {}", self.message)
    }
}

pub fn validate_fixture(fixture: &Fixture) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (routine_id, routine) in &fixture.routines {
        for (day, periods) in &routine.days {
            let issue = |severity, period: Option<&str>, message: String| Issue {
                severity,
                routine: routine_id.clone(),
                day: day.clone(),
                period: period.map(str::to_string),
                message,
            };

            if Fixture::day_key(day).is_none() {
                issues.push(issue(
                    Severity::Warning,
                    None,
                    "day key is not one of mon..fri and is never fetched".into(),
                ));
                continue;
            }

            let mut seen: BTreeMap<i64, &str> = BTreeMap::new();
            for (period_id, fields) in periods {
                let period_id = period_id.as_str();
                let Some(number) = parse_period_number(period_id) else {
                    issues.push(issue(
                        Severity::Warning,
                        Some(period_id),
                        "id has no leading period number and never matches a slot".into(),
                    ));
                    continue;
                };

                if let Some(first) = seen.insert(number, period_id) {
                    issues.push(issue(
                        Severity::Error,
                        Some(period_id),
                        format!("duplicate period number {number}, also used by '{first}'"),
                    ));
                }

                match u32::try_from(number).ok().and_then(time_slot) {
                    None => issues.push(issue(
                        Severity::Warning,
                        Some(period_id),
                        format!("period {number} is outside the 1-8 grid"),
                    )),
                    Some(slot) if slot.is_lunch => issues.push(issue(
                        Severity::Warning,
                        Some(period_id),
                        format!("period {number} falls on the lunch break and is hidden"),
                    )),
                    Some(_) => {}
                }

                if SUBJECT_CHAIN.resolve(fields).is_empty() {
                    issues.push(issue(
                        Severity::Warning,
                        Some(period_id),
                        "no subject field, cell renders as a placeholder".into(),
                    ));
                }
            }
        }
    }

    issues
}
