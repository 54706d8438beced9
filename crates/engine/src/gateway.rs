//! Seams to the external collaborators: the tabular data store and the
//! employee directory. The engine performs no SQL or file IO of its own.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::model::{Division, RawRecord};
use crate::period::PeriodKey;

// ---------------------------------------------------------------------------
// Record gateway
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum GatewayError {
    /// Data source unreachable or unreadable.
    Connection(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "gateway connection failure: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Access to one estate's period-partitioned scan data.
///
/// "No rows" is `Ok(vec![])` — zero activity, not an error. The connection
/// is treated as exclusively owned by the running thread for the duration
/// of a run.
pub trait RecordGateway {
    fn fetch_records(
        &self,
        period: PeriodKey,
        division_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRecord>, GatewayError>;

    fn divisions_with_activity(
        &self,
        period: PeriodKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Division>, GatewayError>;

    fn test_connection(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Employee directory
// ---------------------------------------------------------------------------

pub trait EmployeeDirectory {
    fn lookup_name(&self, employee_id: &str) -> Option<String>;
}

/// Deterministic fallback when the id is not in the directory.
pub fn display_name(directory: &dyn EmployeeDirectory, employee_id: &str) -> String {
    directory
        .lookup_name(employee_id)
        .unwrap_or_else(|| format!("EMP-{employee_id}"))
}

/// Bounded, time-limited name cache wrapped around any directory.
///
/// Owned explicitly by the caller (the orchestrator's run scope), not a
/// module-level global. Negative lookups are cached too: the fallback name
/// is deterministic, so re-querying an absent id buys nothing.
pub struct CachedDirectory<D> {
    inner: D,
    max_entries: usize,
    ttl: Duration,
    cache: Mutex<HashMap<String, (Instant, Option<String>)>>,
}

impl<D: EmployeeDirectory> CachedDirectory<D> {
    pub fn new(inner: D, max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner,
            max_entries,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<D: EmployeeDirectory> EmployeeDirectory for CachedDirectory<D> {
    fn lookup_name(&self, employee_id: &str) -> Option<String> {
        let now = Instant::now();
        let mut cache = self.cache.lock();

        if let Some((stored_at, name)) = cache.get(employee_id) {
            if now.duration_since(*stored_at) < self.ttl {
                return name.clone();
            }
        }

        let name = self.inner.lookup_name(employee_id);

        if cache.len() >= self.max_entries {
            cache.retain(|_, (stored_at, _)| now.duration_since(*stored_at) < self.ttl);
        }
        if cache.len() < self.max_entries {
            cache.insert(employee_id.to_string(), (now, name.clone()));
        }

        name
    }
}
