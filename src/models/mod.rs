//! Data models for the timetable cache.
//!
//! Upstream payloads keep the upstream camelCase JSON shape so cached documents
//! can be served back verbatim.

mod employee;
mod favorite;
mod group;
mod schedule;

pub use employee::*;
pub use favorite::*;
pub use group::*;
pub use schedule::*;

use chrono::{DateTime, Utc};

/// A payload as held by the document store, with its bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub data: T,
    /// Local write date, `dd.mm.yyyy`
    pub last_update_date: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
