use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: u32 = 1;

/// One classified file change: the day it happened and its line delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDelta {
    pub day: u32,
    pub added: u64,
    pub removed: u64,
}

impl RawDelta {
    pub fn new(day: u32, added: u64, removed: u64) -> Self {
        Self { day, added, removed }
    }
}

/// Day-sorted churn with one entry per distinct day.
///
/// `days` is strictly increasing and the three vectors always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub days: Vec<u32>,
    pub additions: Vec<u64>,
    pub removals: Vec<u64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn total_added(&self) -> u64 {
        self.additions.iter().sum()
    }

    pub fn total_removed(&self) -> u64 {
        self.removals.iter().sum()
    }
}

/// Finalized churn of one analysis run.
///
/// `people` is keyed by author display name and stays empty unless per-author
/// tracking was enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnResult {
    pub global: Series,
    pub people: BTreeMap<String, Series>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub since: Option<String>,
    pub until: Option<String>,
    pub track_people: bool,
    pub result: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp > &until {
                return false;
            }
        }
        true
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}
