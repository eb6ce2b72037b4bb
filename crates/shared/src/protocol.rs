use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{DayKey, RoutineId};

pub const ROUTINES_COLLECTION: &str = "routines";

/// One document as delivered by the realtime store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Slash-separated path to a collection, e.g. `routines` or `routines/10A/mon`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn routines() -> Self {
        Self(ROUTINES_COLLECTION.to_string())
    }

    pub fn routine_day(routine_id: &RoutineId, day: DayKey) -> Self {
        Self(format!("{ROUTINES_COLLECTION}/{routine_id}/{day}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Routine that owns this path, if it is a per-day sub-collection.
    pub fn routine_id(&self) -> Option<RoutineId> {
        let mut segments = self.segments();
        match (segments.next(), segments.next(), segments.next()) {
            (Some(ROUTINES_COLLECTION), Some(id), Some(_)) => Some(RoutineId::new(id)),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
