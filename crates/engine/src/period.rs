use chrono::{Datelike, NaiveDate};
use serde::Serializer;

use crate::error::EngineError;

/// Identifies one month-partitioned data source, e.g. `2025-05`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl serde::Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Expand a date range into the calendar months it spans, ascending.
///
/// Order is irrelevant for correctness but fixed for reproducible logs.
pub fn plan_periods(start: NaiveDate, end: NaiveDate) -> Result<Vec<PeriodKey>, EngineError> {
    if start > end {
        return Err(EngineError::InvalidRange { start, end });
    }

    let mut periods = Vec::new();
    let mut current = PeriodKey::of(start);
    let last = PeriodKey::of(end);
    loop {
        periods.push(current);
        if current == last {
            break;
        }
        current = if current.month == 12 {
            PeriodKey { year: current.year + 1, month: 1 }
        } else {
            PeriodKey { year: current.year, month: current.month + 1 }
        };
    }
    Ok(periods)
}
