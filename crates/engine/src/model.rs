use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single normalized scan row from one period partition.
///
/// Built once at the data-gateway boundary; the engine never touches raw
/// column positions. `measurements` holds named bunch counts; an absent key
/// is semantically zero.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub record_id: i64,
    pub employee_id: String,
    pub record_tag: String,
    pub transaction_number: String,
    pub transaction_date: NaiveDate,
    pub transaction_status: String,
    pub field_id: String,
    pub division_id: String,
    pub measurements: BTreeMap<String, i64>,
}

/// Functional role of a scan row, derived from its record tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Creator,
    VerifierPrimary,
    VerifierSecondary,
    Unclassified,
}

impl Role {
    pub fn is_verifier(self) -> bool {
        matches!(self, Self::VerifierPrimary | Self::VerifierSecondary)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creator => write!(f, "creator"),
            Self::VerifierPrimary => write!(f, "verifier_primary"),
            Self::VerifierSecondary => write!(f, "verifier_secondary"),
            Self::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// An organizational division. Pure label, no behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Division {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Pairing of one creator row with its selected verifier row, if any.
///
/// One match per (transaction number, creator row). A duplicate data-entry
/// produces multiple matches against the same verifier candidate.
#[derive(Debug, Clone)]
pub struct VerificationMatch {
    pub transaction_number: String,
    pub creator: RawRecord,
    pub verifier: Option<RawRecord>,
    pub is_verified: bool,
    pub field_differences: BTreeSet<String>,
}

/// Matches plus the diagnostic tallies that fall out of detection.
#[derive(Debug, Clone, Default)]
pub struct DetectOutput {
    pub matches: Vec<VerificationMatch>,
    /// Verifier-tagged rows whose transaction has no creator row.
    pub orphan_verifiers: u64,
    /// Rows whose tag resolved to no functional role.
    pub unclassified: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Per-employee verification counters for one division. Mutated while
/// scanning matches, rates filled in by the finalize pass.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeMetrics {
    pub employee_id: String,
    pub name: String,
    pub created_count: u64,
    pub verified_count: u64,
    pub difference_count: u64,
    pub verifier_counts: BTreeMap<Role, u64>,
    pub verification_rate: f64,
    pub difference_rate: f64,
}

impl EmployeeMetrics {
    pub fn new(employee_id: String, name: String) -> Self {
        Self {
            employee_id,
            name,
            created_count: 0,
            verified_count: 0,
            difference_count: 0,
            verifier_counts: BTreeMap::new(),
            verification_rate: 0.0,
            difference_rate: 0.0,
        }
    }
}

/// One division's roll-up. Rates are recomputed from the division totals,
/// never averaged from per-employee rates.
#[derive(Debug, Clone, Serialize)]
pub struct DivisionSummary {
    pub estate_name: String,
    pub division_id: String,
    pub division_name: String,
    pub created_total: u64,
    pub verified_total: u64,
    pub difference_total: u64,
    pub verifier_totals: BTreeMap<Role, u64>,
    pub orphan_verifiers: u64,
    pub unclassified: u64,
    pub verification_rate: f64,
    pub difference_rate: f64,
    pub employees: BTreeMap<String, EmployeeMetrics>,
}

/// Grand totals across an estate's divisions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EstateTotals {
    pub created_total: u64,
    pub verified_total: u64,
    pub difference_total: u64,
    pub verifier_totals: BTreeMap<Role, u64>,
    pub orphan_verifiers: u64,
    pub unclassified: u64,
    pub verification_rate: f64,
    pub difference_rate: f64,
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

/// A unit (estate, or one division of it) that was skipped, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedUnit {
    pub estate_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division_id: Option<String>,
    pub reason: String,
}

/// Everything reconciled for one estate over the analysis range.
#[derive(Debug, Clone, Serialize)]
pub struct EstateRunResult {
    pub estate_id: String,
    pub estate_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub periods: Vec<crate::period::PeriodKey>,
    pub status_filter_active: bool,
    pub duration_ms: u64,
    pub divisions: Vec<DivisionSummary>,
    pub totals: EstateTotals,
    pub skipped: Vec<SkippedUnit>,
}

/// Multi-estate run output. Always whatever succeeded, annotated with the
/// units that did not.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub engine_version: String,
    pub config_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub estates: Vec<EstateRunResult>,
    pub skipped: Vec<SkippedUnit>,
    pub cancelled: bool,
}
