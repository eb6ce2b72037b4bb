use std::{fmt, str::FromStr};

use chrono::Weekday;
use serde::{Deserialize, Serialize};

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id_newtype!(RoutineId);

/// A class/section whose weekly timetable can be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: RoutineId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Routine {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: RoutineId::new(id),
            name: name.map(str::to_string),
        }
    }

    /// Display label: the name when present and non-empty, otherwise the id.
    pub fn label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.id.as_str(),
        }
    }
}

/// Weekday keys fetched for every routine. Saturday is intentionally absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKey {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl DayKey {
    pub const ALL: [DayKey; 5] = [
        DayKey::Mon,
        DayKey::Tue,
        DayKey::Wed,
        DayKey::Thu,
        DayKey::Fri,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayKey::Mon => "mon",
            DayKey::Tue => "tue",
            DayKey::Wed => "wed",
            DayKey::Thu => "thu",
            DayKey::Fri => "fri",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DayKey::Mon => "Monday",
            DayKey::Tue => "Tuesday",
            DayKey::Wed => "Wednesday",
            DayKey::Thu => "Thursday",
            DayKey::Fri => "Friday",
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Mon => Some(DayKey::Mon),
            Weekday::Tue => Some(DayKey::Tue),
            Weekday::Wed => Some(DayKey::Wed),
            Weekday::Thu => Some(DayKey::Thu),
            Weekday::Fri => Some(DayKey::Fri),
            Weekday::Sat | Weekday::Sun => None,
        }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDayKey(pub String);

impl fmt::Display for UnknownDayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown day key '{}'", self.0)
    }
}

impl std::error::Error for UnknownDayKey {}

impl FromStr for DayKey {
    type Err = UnknownDayKey;

    /// Accepts the key itself or a day name; only the first three letters matter.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_ascii_lowercase();
        let prefix = lower.get(..3).unwrap_or(&lower);
        DayKey::ALL
            .into_iter()
            .find(|day| day.as_str() == prefix)
            .ok_or_else(|| UnknownDayKey(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub period: u32,
    pub time: &'static str,
    pub is_lunch: bool,
}

pub const LUNCH_BREAK_LABEL: &str = "Lunch Break";

pub const TIME_SLOTS: [TimeSlot; 8] = [
    TimeSlot { period: 1, time: "9:00 - 10:00", is_lunch: false },
    TimeSlot { period: 2, time: "10:00 - 11:00", is_lunch: false },
    TimeSlot { period: 3, time: "11:00 - 12:00", is_lunch: false },
    TimeSlot { period: 4, time: "12:00 - 1:00", is_lunch: true },
    TimeSlot { period: 5, time: "1:00 - 2:00", is_lunch: false },
    TimeSlot { period: 6, time: "2:00 - 3:00", is_lunch: false },
    TimeSlot { period: 7, time: "3:00 - 4:00", is_lunch: false },
    TimeSlot { period: 8, time: "4:00 - 5:00", is_lunch: false },
];

pub fn time_slot(period: u32) -> Option<&'static TimeSlot> {
    TIME_SLOTS.iter().find(|slot| slot.period == period)
}
