//! Status-restricted verification window.
//!
//! A time-bound business exception: inside a configured calendar window, and
//! only on estates that opted in, a verifier row counts as a candidate only
//! when its transaction status equals the required status code. Outside the
//! window the policy is a no-op. Injected into the detector, never
//! hard-coded there.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::EngineError;

#[derive(Debug, Clone, Deserialize)]
pub struct StatusFilterConfig {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub required_status: String,
}

/// The policy as it applies to one run: present only when active.
#[derive(Debug, Clone)]
pub struct ActiveStatusFilter {
    pub required_status: String,
}

impl StatusFilterConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window_start > self.window_end {
            return Err(EngineError::ConfigValidation(format!(
                "status filter window starts {} after it ends {}",
                self.window_start, self.window_end
            )));
        }
        if self.required_status.is_empty() {
            return Err(EngineError::ConfigValidation(
                "status filter requires a non-empty status code".into(),
            ));
        }
        Ok(())
    }

    /// Active only when the analysis range intersects the window AND the
    /// estate opted in.
    pub fn activate(
        &self,
        period_start: NaiveDate,
        period_end: NaiveDate,
        estate_flag: bool,
    ) -> Option<ActiveStatusFilter> {
        if !estate_flag {
            return None;
        }
        let intersects = period_start <= self.window_end && period_end >= self.window_start;
        if intersects {
            Some(ActiveStatusFilter { required_status: self.required_status.clone() })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn may_filter() -> StatusFilterConfig {
        StatusFilterConfig {
            window_start: d("2025-05-01"),
            window_end: d("2025-05-31"),
            required_status: "704".into(),
        }
    }

    #[test]
    fn active_inside_window_with_flag() {
        let active = may_filter().activate(d("2025-05-10"), d("2025-05-20"), true);
        assert_eq!(active.unwrap().required_status, "704");
    }

    #[test]
    fn inactive_without_estate_flag() {
        assert!(may_filter().activate(d("2025-05-10"), d("2025-05-20"), false).is_none());
    }

    #[test]
    fn inactive_outside_window() {
        assert!(may_filter().activate(d("2025-06-01"), d("2025-06-30"), true).is_none());
    }

    #[test]
    fn overlap_at_edges_counts() {
        // Range ends on the window's first day.
        assert!(may_filter().activate(d("2025-04-15"), d("2025-05-01"), true).is_some());
        // Range starts on the window's last day.
        assert!(may_filter().activate(d("2025-05-31"), d("2025-06-15"), true).is_some());
    }

    #[test]
    fn rejects_inverted_window() {
        let bad = StatusFilterConfig {
            window_start: d("2025-06-01"),
            window_end: d("2025-05-01"),
            required_status: "704".into(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn rejects_empty_status() {
        let bad = StatusFilterConfig {
            window_start: d("2025-05-01"),
            window_end: d("2025-05-31"),
            required_status: String::new(),
        };
        assert!(bad.validate().is_err());
    }
}
