use std::collections::BTreeMap;

use crate::model::{DetectOutput, RawRecord, Role, VerificationMatch};
use crate::policy::ActiveStatusFilter;
use crate::role::RoleResolver;

/// Group records by business transaction number and pair each creator row
/// with its best verifier candidate.
///
/// Candidate selection: verifier-priority order first (primary before
/// secondary), then lowest record id. Record ids are gateway-assigned and
/// stable, so the tie-break is deterministic across reruns.
pub fn detect(
    records: &[RawRecord],
    resolver: &RoleResolver,
    status_filter: Option<&ActiveStatusFilter>,
) -> DetectOutput {
    // Partition by transaction number. BTreeMap keeps emission order stable.
    let mut partitions: BTreeMap<&str, Vec<&RawRecord>> = BTreeMap::new();
    for record in records {
        partitions
            .entry(record.transaction_number.as_str())
            .or_default()
            .push(record);
    }

    let mut output = DetectOutput::default();

    for (transaction_number, members) in partitions {
        let mut creators: Vec<&RawRecord> = Vec::new();
        let mut verifiers: Vec<(Role, &RawRecord)> = Vec::new();

        for member in members {
            match resolver.resolve(&member.record_tag) {
                Role::Creator => creators.push(member),
                role if role.is_verifier() => verifiers.push((role, member)),
                _ => output.unclassified += 1,
            }
        }

        // A transaction with only verifier rows is not reconcilable. Count
        // it for diagnostics rather than dropping it silently.
        if creators.is_empty() {
            output.orphan_verifiers += verifiers.len() as u64;
            continue;
        }

        let candidate = select_verifier(&verifiers, resolver, status_filter);

        // One match per creator row; duplicate entries share the candidate.
        for creator in creators {
            output.matches.push(VerificationMatch {
                transaction_number: transaction_number.to_string(),
                creator: (*creator).clone(),
                verifier: candidate.cloned(),
                is_verified: candidate.is_some(),
                field_differences: Default::default(),
            });
        }
    }

    output
}

/// Pick the verifier candidate, narrowing by required status first when the
/// filter is active. Narrowing may empty the set: the transaction is then
/// unverified even though raw duplicates exist.
fn select_verifier<'a>(
    verifiers: &[(Role, &'a RawRecord)],
    resolver: &RoleResolver,
    status_filter: Option<&ActiveStatusFilter>,
) -> Option<&'a RawRecord> {
    let eligible: Vec<&(Role, &RawRecord)> = verifiers
        .iter()
        .filter(|(_, record)| match status_filter {
            Some(filter) => record.transaction_status == filter.required_status,
            None => true,
        })
        .collect();

    for wanted in resolver.verifier_priority() {
        let best = eligible
            .iter()
            .filter(|(role, _)| role == wanted)
            .map(|(_, record)| *record)
            .min_by_key(|record| record.record_id);
        if let Some(record) = best {
            return Some(record);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RolesConfig;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn resolver() -> RoleResolver {
        RoleResolver::from_config(&RolesConfig {
            tags: BTreeMap::from([
                ("P1".to_string(), Role::Creator),
                ("P2".to_string(), Role::VerifierPrimary),
                ("P5".to_string(), Role::VerifierSecondary),
            ]),
            verifier_priority: vec![Role::VerifierPrimary, Role::VerifierSecondary],
        })
    }

    fn record(id: i64, employee: &str, tag: &str, transaction: &str, status: &str) -> RawRecord {
        RawRecord {
            record_id: id,
            employee_id: employee.into(),
            record_tag: tag.into(),
            transaction_number: transaction.into(),
            transaction_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            transaction_status: status.into(),
            field_id: "F01".into(),
            division_id: "D01".into(),
            measurements: BTreeMap::new(),
        }
    }

    #[test]
    fn creator_with_primary_verifier() {
        let records = vec![
            record(1, "E1", "P1", "T001", "700"),
            record(2, "E2", "P2", "T001", "700"),
        ];
        let out = detect(&records, &resolver(), None);
        assert_eq!(out.matches.len(), 1);
        let m = &out.matches[0];
        assert!(m.is_verified);
        assert_eq!(m.verifier.as_ref().unwrap().employee_id, "E2");
        assert_eq!(out.orphan_verifiers, 0);
    }

    #[test]
    fn creator_alone_is_unverified() {
        let records = vec![record(1, "E1", "P1", "T002", "700")];
        let out = detect(&records, &resolver(), None);
        assert_eq!(out.matches.len(), 1);
        assert!(!out.matches[0].is_verified);
        assert!(out.matches[0].verifier.is_none());
    }

    #[test]
    fn primary_preferred_over_secondary() {
        let records = vec![
            record(1, "E1", "P1", "T003", "700"),
            record(2, "E2", "P5", "T003", "700"),
            record(3, "E3", "P2", "T003", "700"),
        ];
        let out = detect(&records, &resolver(), None);
        assert_eq!(out.matches[0].verifier.as_ref().unwrap().employee_id, "E3");
    }

    #[test]
    fn same_role_tie_breaks_on_lowest_record_id() {
        let records = vec![
            record(1, "E1", "P1", "T004", "700"),
            record(9, "E9", "P2", "T004", "700"),
            record(4, "E4", "P2", "T004", "700"),
        ];
        let out = detect(&records, &resolver(), None);
        assert_eq!(out.matches[0].verifier.as_ref().unwrap().record_id, 4);
    }

    #[test]
    fn orphan_verifiers_counted_not_matched() {
        let records = vec![
            record(1, "E2", "P2", "T005", "700"),
            record(2, "E5", "P5", "T005", "700"),
        ];
        let out = detect(&records, &resolver(), None);
        assert!(out.matches.is_empty());
        assert_eq!(out.orphan_verifiers, 2);
    }

    #[test]
    fn unclassified_rows_excluded_and_tallied() {
        let records = vec![
            record(1, "E1", "P1", "T006", "700"),
            record(2, "E2", "XX", "T006", "700"),
        ];
        let out = detect(&records, &resolver(), None);
        assert_eq!(out.unclassified, 1);
        assert!(!out.matches[0].is_verified);
    }

    #[test]
    fn status_filter_narrows_candidates() {
        let filter = ActiveStatusFilter { required_status: "704".into() };
        let records = vec![
            record(1, "E1", "P1", "T007", "700"),
            record(2, "E2", "P2", "T007", "700"),
            record(3, "E3", "P5", "T007", "704"),
        ];
        let out = detect(&records, &resolver(), Some(&filter));
        // The primary verifier has the wrong status; the secondary wins.
        assert_eq!(out.matches[0].verifier.as_ref().unwrap().employee_id, "E3");
    }

    #[test]
    fn status_filter_can_empty_the_candidate_set() {
        let filter = ActiveStatusFilter { required_status: "704".into() };
        let records = vec![
            record(1, "E1", "P1", "T008", "700"),
            record(2, "E2", "P2", "T008", "700"),
        ];
        let out = detect(&records, &resolver(), Some(&filter));
        assert!(!out.matches[0].is_verified, "raw duplicate exists but wrong status");
    }

    #[test]
    fn duplicate_creators_each_get_a_match() {
        let records = vec![
            record(1, "E1", "P1", "T009", "700"),
            record(2, "E1", "P1", "T009", "700"),
            record(3, "E2", "P2", "T009", "700"),
        ];
        let out = detect(&records, &resolver(), None);
        assert_eq!(out.matches.len(), 2);
        for m in &out.matches {
            assert_eq!(m.verifier.as_ref().unwrap().record_id, 3);
        }
    }
}
