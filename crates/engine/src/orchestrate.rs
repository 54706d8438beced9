//! Drives reconciliation across estates and divisions.
//!
//! Failure isolation: a unit that cannot be fetched is recorded and skipped;
//! the run continues and always returns whatever was reconciled. Processing
//! is sequential; cancellation is cooperative, polled between units only —
//! work already started on a division runs to completion.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::aggregate::{aggregate, estate_totals, DivisionContext};
use crate::compare::annotate_differences;
use crate::config::{EngineConfig, EstateConfig};
use crate::detect::detect;
use crate::error::EngineError;
use crate::gateway::{EmployeeDirectory, GatewayError, RecordGateway};
use crate::model::{Division, EstateRunResult, RawRecord, RunResult, SkippedUnit};
use crate::period::{plan_periods, PeriodKey};
use crate::role::RoleResolver;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag shared with a front end.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Run units
// ---------------------------------------------------------------------------

/// One estate plus the gateway that serves its data.
pub struct EstateUnit<'a> {
    pub estate: &'a EstateConfig,
    pub gateway: &'a dyn RecordGateway,
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Reconcile every estate over the analysis range.
///
/// Range and config errors fail fast; everything per-unit is recovered into
/// `skipped`.
pub fn run_estates(
    units: &[EstateUnit<'_>],
    config: &EngineConfig,
    directory: &dyn EmployeeDirectory,
    start: NaiveDate,
    end: NaiveDate,
    cancel: &CancelFlag,
) -> Result<RunResult, EngineError> {
    let periods = plan_periods(start, end)?;
    let resolver = RoleResolver::from_config(&config.roles);

    let mut estates = Vec::new();
    let mut skipped = Vec::new();

    for unit in units {
        if cancel.is_cancelled() {
            info!(estate = %unit.estate.id, "run cancelled before estate");
            break;
        }

        if !unit.gateway.test_connection() {
            warn!(estate = %unit.estate.id, "gateway connection test failed, skipping estate");
            skipped.push(SkippedUnit {
                estate_id: unit.estate.id.clone(),
                division_id: None,
                reason: "connection test failed".into(),
            });
            continue;
        }

        match run_estate(unit, config, &resolver, directory, start, end, &periods, cancel) {
            Ok(result) => {
                skipped.extend(result.skipped.iter().cloned());
                estates.push(result);
            }
            Err(e) => {
                warn!(estate = %unit.estate.id, error = %e, "estate skipped");
                skipped.push(SkippedUnit {
                    estate_id: unit.estate.id.clone(),
                    division_id: None,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(RunResult {
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        config_name: config.name.clone(),
        period_start: start,
        period_end: end,
        estates,
        skipped,
        cancelled: cancel.is_cancelled(),
    })
}

/// Reconcile one estate: union of active divisions across the spanned
/// periods, then detect → compare → aggregate per division.
#[allow(clippy::too_many_arguments)]
fn run_estate(
    unit: &EstateUnit<'_>,
    config: &EngineConfig,
    resolver: &RoleResolver,
    directory: &dyn EmployeeDirectory,
    start: NaiveDate,
    end: NaiveDate,
    periods: &[PeriodKey],
    cancel: &CancelFlag,
) -> Result<EstateRunResult, GatewayError> {
    let started = Instant::now();
    let estate = unit.estate;

    let status_filter = config
        .status_filter
        .as_ref()
        .and_then(|f| f.activate(start, end, estate.status_filter));

    // Deduplicate divisions across periods, ordered by id.
    let mut divisions_by_id: BTreeMap<String, Division> = BTreeMap::new();
    for period in periods {
        for division in unit.gateway.divisions_with_activity(*period, start, end)? {
            divisions_by_id.entry(division.id.clone()).or_insert(division);
        }
    }

    info!(
        estate = %estate.id,
        divisions = divisions_by_id.len(),
        periods = periods.len(),
        status_filter = status_filter.is_some(),
        "estate run started"
    );

    let mut summaries = Vec::new();
    let mut skipped = Vec::new();

    for division in divisions_by_id.values() {
        if cancel.is_cancelled() {
            info!(estate = %estate.id, "run cancelled between divisions");
            break;
        }

        let records = match fetch_division(unit.gateway, periods, &division.id, start, end) {
            Ok(records) => records,
            Err(e) => {
                warn!(estate = %estate.id, division = %division.id, error = %e, "division skipped");
                skipped.push(SkippedUnit {
                    estate_id: estate.id.clone(),
                    division_id: Some(division.id.clone()),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        // Zero activity: no entry, not a zero-filled one.
        if records.is_empty() {
            continue;
        }

        let mut detected = detect(&records, resolver, status_filter.as_ref());
        annotate_differences(&mut detected.matches, &config.comparison.fields);

        let summary = aggregate(
            DivisionContext {
                estate_name: &estate.name,
                division_id: &division.id,
                division_name: &division.name,
            },
            &records,
            &detected,
            resolver,
            config.comparison.policy,
            directory,
        );

        info!(
            estate = %estate.id,
            division = %division.id,
            created = summary.created_total,
            verified = summary.verified_total,
            "division reconciled"
        );
        summaries.push(summary);
    }

    let totals = estate_totals(&summaries);

    Ok(EstateRunResult {
        estate_id: estate.id.clone(),
        estate_name: estate.name.clone(),
        period_start: start,
        period_end: end,
        periods: periods.to_vec(),
        status_filter_active: status_filter.is_some(),
        duration_ms: started.elapsed().as_millis() as u64,
        divisions: summaries,
        totals,
        skipped,
    })
}

/// Concatenate one division's records across every spanned period.
fn fetch_division(
    gateway: &dyn RecordGateway,
    periods: &[PeriodKey],
    division_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RawRecord>, GatewayError> {
    let mut records = Vec::new();
    for period in periods {
        records.extend(gateway.fetch_records(*period, division_id, start, end)?);
    }
    Ok(records)
}
