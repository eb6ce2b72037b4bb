//! Raw period documents and their normalized display cell.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value};
use shared::protocol::Document;

/// Ordered candidate keys for one display field; the first usable value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldChain {
    pub field: &'static str,
    pub candidates: &'static [&'static str],
}

pub const SUBJECT_CHAIN: FieldChain = FieldChain {
    field: "subject",
    candidates: &["sname", "subject", "name"],
};

pub const TEACHER_CHAIN: FieldChain = FieldChain {
    field: "teacher",
    candidates: &["tname", "teacher"],
};

pub const CODE_CHAIN: FieldChain = FieldChain {
    field: "code",
    candidates: &["scode", "code"],
};

pub const ROOM_CHAIN: FieldChain = FieldChain {
    field: "room",
    candidates: &["room"],
};

impl FieldChain {
    /// Empty strings, null and booleans fall through to the next candidate.
    pub fn resolve(&self, fields: &Map<String, Value>) -> String {
        self.candidates
            .iter()
            .find_map(|key| match fields.get(*key) {
                Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
                Some(Value::Number(number)) => Some(number.to_string()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Leading-integer parse of a period document id: optional whitespace and
/// sign, then digits. Anything after the digits is ignored.
pub fn parse_period_number(id: &str) -> Option<i64> {
    let trimmed = id.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits_end = rest
        .bytes()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    rest[..digits_end]
        .parse::<i64>()
        .ok()
        .map(|value| sign * value)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRecord {
    pub id: String,
    pub period_number: Option<i64>,
    pub fields: Map<String, Value>,
}

impl PeriodRecord {
    pub fn from_document(document: Document) -> Self {
        Self {
            period_number: parse_period_number(&document.id),
            id: document.id,
            fields: document.fields,
        }
    }

    pub fn resolve(&self, chain: &FieldChain) -> String {
        chain.resolve(&self.fields)
    }

    pub fn cell(&self) -> PeriodCell {
        PeriodCell {
            subject: self.resolve(&SUBJECT_CHAIN),
            teacher: self.resolve(&TEACHER_CHAIN),
            code: self.resolve(&CODE_CHAIN),
            room: self.resolve(&ROOM_CHAIN),
        }
    }
}

/// Ascending by period number; records without one go last in arrival order.
pub fn compare_periods(a: &PeriodRecord, b: &PeriodRecord) -> Ordering {
    match (a.period_number, b.period_number) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodCell {
    pub subject: String,
    pub teacher: String,
    pub code: String,
    pub room: String,
}

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod tests;
