use std::collections::BTreeSet;

use serde::Deserialize;

use crate::model::{RawRecord, VerificationMatch};

/// How field disagreements feed the difference counters.
///
/// Legacy reports disagreed on this; both policies are kept and the choice
/// is configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferencePolicy {
    /// A verified transaction contributes at most 1, however many fields
    /// disagree.
    #[default]
    PerTransaction,
    /// Every disagreeing field contributes 1.
    PerField,
}

impl DifferencePolicy {
    pub fn increment(self, differences: &BTreeSet<String>) -> u64 {
        match self {
            Self::PerTransaction => u64::from(!differences.is_empty()),
            Self::PerField => differences.len() as u64,
        }
    }
}

/// Compare the named measurement fields of a creator row against its
/// verifier row. A missing value is numeric zero; equality is exact (the
/// source values are integer bunch counts).
pub fn compare_fields(
    creator: &RawRecord,
    verifier: &RawRecord,
    fields: &[String],
) -> BTreeSet<String> {
    fields
        .iter()
        .filter(|f| {
            let a = creator.measurements.get(*f).copied().unwrap_or(0);
            let b = verifier.measurements.get(*f).copied().unwrap_or(0);
            a != b
        })
        .cloned()
        .collect()
}

/// Fill in `field_differences` for every verified match.
pub fn annotate_differences(matches: &mut [VerificationMatch], fields: &[String]) {
    for m in matches.iter_mut() {
        if let Some(ref verifier) = m.verifier {
            m.field_differences = compare_fields(&m.creator, verifier, fields);
        }
    }
}
