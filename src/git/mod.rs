pub mod identity;
pub mod repo;

pub use identity::IdentityTable;
pub use repo::{CommitRecord, GitRepo};

use chrono::{DateTime, Utc};

/// Whole days elapsed between the start of the history and `timestamp`.
pub fn day_index(start: &DateTime<Utc>, timestamp: &DateTime<Utc>) -> u32 {
    (*timestamp - *start).num_days().clamp(0, i64::from(u32::MAX)) as u32
}
