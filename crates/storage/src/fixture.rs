use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{
    domain::{DayKey, Routine, RoutineId},
    protocol::{CollectionPath, ROUTINES_COLLECTION},
};

/// Seed content for [`crate::MemoryStore`], shaped like the document tree:
/// `routines/{id}` documents with per-day sub-collections of period documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub routines: BTreeMap<String, RoutineFixture>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutineFixture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Day key -> period document id -> fields. Keys other than the five
    /// weekday keys (`mon`..`fri`) are stored verbatim but never fetched.
    #[serde(default)]
    pub days: BTreeMap<String, BTreeMap<String, Map<String, Value>>>,
}

impl Fixture {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture '{}'", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("failed to parse fixture '{}'", path.display()))
    }

    pub fn routine_list(&self) -> Vec<Routine> {
        self.routines
            .iter()
            .map(|(id, routine)| Routine {
                id: RoutineId::new(id.as_str()),
                name: routine.name.clone(),
            })
            .collect()
    }

    pub fn day_key(raw: &str) -> Option<DayKey> {
        DayKey::ALL.into_iter().find(|day| day.as_str() == raw)
    }

    pub(crate) fn collections(
        &self,
    ) -> BTreeMap<CollectionPath, BTreeMap<String, Map<String, Value>>> {
        let mut collections = BTreeMap::new();
        let mut routine_documents = BTreeMap::new();

        for (id, routine) in &self.routines {
            let mut fields = Map::new();
            if let Some(name) = &routine.name {
                fields.insert("name".to_string(), Value::String(name.clone()));
            }
            routine_documents.insert(id.clone(), fields);

            for (day, periods) in &routine.days {
                collections.insert(
                    CollectionPath::new(format!("{ROUTINES_COLLECTION}/{id}/{day}")),
                    periods.clone(),
                );
            }
        }

        collections.insert(CollectionPath::routines(), routine_documents);
        collections
    }
}
