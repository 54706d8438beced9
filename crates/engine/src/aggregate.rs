use std::collections::BTreeMap;

use crate::compare::DifferencePolicy;
use crate::gateway::{display_name, EmployeeDirectory};
use crate::model::{DetectOutput, DivisionSummary, EmployeeMetrics, EstateTotals, RawRecord, Role};
use crate::role::RoleResolver;

/// Labels for the division being aggregated.
#[derive(Debug, Clone, Copy)]
pub struct DivisionContext<'a> {
    pub estate_name: &'a str,
    pub division_id: &'a str,
    pub division_name: &'a str,
}

/// Roll matches and raw verifier activity up into one division summary.
///
/// Verifier activity is counted from every verifier-role raw record,
/// independent of whether it matched anything. Rates are computed from the
/// totals in a final pass.
pub fn aggregate(
    ctx: DivisionContext<'_>,
    records: &[RawRecord],
    detected: &DetectOutput,
    resolver: &RoleResolver,
    policy: DifferencePolicy,
    directory: &dyn EmployeeDirectory,
) -> DivisionSummary {
    let mut employees: BTreeMap<String, EmployeeMetrics> = BTreeMap::new();

    let metrics_for = |employees: &mut BTreeMap<String, EmployeeMetrics>, id: &str| {
        if !employees.contains_key(id) {
            let name = display_name(directory, id);
            employees.insert(id.to_string(), EmployeeMetrics::new(id.to_string(), name));
        }
    };

    for m in &detected.matches {
        let id = m.creator.employee_id.as_str();
        metrics_for(&mut employees, id);
        let metrics = employees.get_mut(id).unwrap();
        metrics.created_count += 1;
        if m.is_verified {
            metrics.verified_count += 1;
            metrics.difference_count += policy.increment(&m.field_differences);
        }
    }

    for record in records {
        let role = resolver.resolve(&record.record_tag);
        if role.is_verifier() {
            let id = record.employee_id.as_str();
            metrics_for(&mut employees, id);
            let metrics = employees.get_mut(id).unwrap();
            *metrics.verifier_counts.entry(role).or_insert(0) += 1;
        }
    }

    let mut created_total = 0;
    let mut verified_total = 0;
    let mut difference_total = 0;
    let mut verifier_totals: BTreeMap<Role, u64> = BTreeMap::new();
    for metrics in employees.values_mut() {
        created_total += metrics.created_count;
        verified_total += metrics.verified_count;
        difference_total += metrics.difference_count;
        for (role, count) in &metrics.verifier_counts {
            *verifier_totals.entry(*role).or_insert(0) += count;
        }
        metrics.verification_rate = rate(metrics.verified_count, metrics.created_count);
        metrics.difference_rate = rate(metrics.difference_count, metrics.verified_count);
    }

    DivisionSummary {
        estate_name: ctx.estate_name.to_string(),
        division_id: ctx.division_id.to_string(),
        division_name: ctx.division_name.to_string(),
        created_total,
        verified_total,
        difference_total,
        verifier_totals,
        orphan_verifiers: detected.orphan_verifiers,
        unclassified: detected.unclassified,
        verification_rate: rate(verified_total, created_total),
        difference_rate: rate(difference_total, verified_total),
        employees,
    }
}

/// Grand totals across an estate's divisions. Rates come from the summed
/// totals, not from averaging division rates.
pub fn estate_totals(divisions: &[DivisionSummary]) -> EstateTotals {
    let mut totals = EstateTotals::default();
    for division in divisions {
        totals.created_total += division.created_total;
        totals.verified_total += division.verified_total;
        totals.difference_total += division.difference_total;
        totals.orphan_verifiers += division.orphan_verifiers;
        totals.unclassified += division.unclassified;
        for (role, count) in &division.verifier_totals {
            *totals.verifier_totals.entry(*role).or_insert(0) += count;
        }
    }
    totals.verification_rate = rate(totals.verified_total, totals.created_total);
    totals.difference_rate = rate(totals.difference_total, totals.verified_total);
    totals
}

/// Percentage, zero when the denominator is zero.
fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}
