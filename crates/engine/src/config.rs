use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::compare::DifferencePolicy;
use crate::error::EngineError;
use crate::model::Role;
use crate::policy::StatusFilterConfig;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub roles: RolesConfig,
    pub comparison: ComparisonConfig,
    #[serde(default)]
    pub status_filter: Option<StatusFilterConfig>,
    #[serde(default)]
    pub estates: Vec<EstateConfig>,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RolesConfig {
    /// Record tag → functional role, e.g. `P1 = "creator"`.
    pub tags: BTreeMap<String, Role>,
    #[serde(default = "default_verifier_priority")]
    pub verifier_priority: Vec<Role>,
}

fn default_verifier_priority() -> Vec<Role> {
    vec![Role::VerifierPrimary, Role::VerifierSecondary]
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonConfig {
    /// Measurement fields compared between creator and verifier. Datasets
    /// expose superset/subset columns, so the canonical list is config.
    pub fields: Vec<String>,
    #[serde(default)]
    pub policy: DifferencePolicy,
}

// ---------------------------------------------------------------------------
// Estates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EstateConfig {
    pub id: String,
    pub name: String,
    /// Opt-in to the status-restricted verification window.
    #[serde(default)]
    pub status_filter: bool,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        // At least one creator tag, and no tag mapped to Unclassified.
        if !self.roles.tags.values().any(|r| *r == Role::Creator) {
            return Err(EngineError::ConfigValidation(
                "role map must assign at least one creator tag".into(),
            ));
        }
        for (tag, role) in &self.roles.tags {
            if *role == Role::Unclassified {
                return Err(EngineError::ConfigValidation(format!(
                    "tag '{tag}' mapped to unclassified; unmapped tags are unclassified already"
                )));
            }
        }

        if self.roles.verifier_priority.is_empty() {
            return Err(EngineError::ConfigValidation(
                "verifier priority order must not be empty".into(),
            ));
        }
        for role in &self.roles.verifier_priority {
            if !role.is_verifier() {
                return Err(EngineError::ConfigValidation(format!(
                    "verifier priority contains non-verifier role '{role}'"
                )));
            }
        }

        if self.comparison.fields.is_empty() {
            return Err(EngineError::ConfigValidation(
                "comparison field list must not be empty".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for field in &self.comparison.fields {
            if !seen.insert(field.as_str()) {
                return Err(EngineError::ConfigValidation(format!(
                    "comparison field '{field}' listed twice"
                )));
            }
        }

        if let Some(ref filter) = self.status_filter {
            filter.validate()?;
        }

        let mut estate_ids = BTreeSet::new();
        for estate in &self.estates {
            if estate.id.is_empty() {
                return Err(EngineError::ConfigValidation("estate with empty id".into()));
            }
            if !estate_ids.insert(estate.id.as_str()) {
                return Err(EngineError::ConfigValidation(format!(
                    "estate id '{}' listed twice",
                    estate.id
                )));
            }
            if estate.status_filter && self.status_filter.is_none() {
                return Err(EngineError::ConfigValidation(format!(
                    "estate '{}' enables the status filter but no [status_filter] is configured",
                    estate.id
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Harvest Verification"

[roles.tags]
P1 = "creator"
P2 = "verifier_primary"
P5 = "verifier_secondary"

[comparison]
fields = ["ripe", "unripe", "black_bunch", "rotten", "long_stalk", "rat_damage", "loose_fruit"]

[status_filter]
window_start = "2025-05-01"
window_end = "2025-05-31"
required_status = "704"

[[estates]]
id = "EST01"
name = "North Estate"
status_filter = true

[[estates]]
id = "EST02"
name = "South Estate"
"#;

    #[test]
    fn parse_valid() {
        let config = EngineConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Harvest Verification");
        assert_eq!(config.roles.tags.len(), 3);
        assert_eq!(
            config.roles.verifier_priority,
            vec![Role::VerifierPrimary, Role::VerifierSecondary]
        );
        assert_eq!(config.comparison.fields.len(), 7);
        assert_eq!(config.comparison.policy, DifferencePolicy::PerTransaction);
        assert_eq!(config.estates.len(), 2);
        assert!(config.estates[0].status_filter);
        assert!(!config.estates[1].status_filter);
    }

    #[test]
    fn parse_per_field_policy() {
        let input = VALID.replace(
            "[comparison]",
            "[comparison]\npolicy = \"per_field\"",
        );
        let config = EngineConfig::from_toml(&input).unwrap();
        assert_eq!(config.comparison.policy, DifferencePolicy::PerField);
    }

    #[test]
    fn reject_missing_creator_tag() {
        let input = VALID.replace("P1 = \"creator\"", "P1 = \"verifier_primary\"");
        let err = EngineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("creator tag"));
    }

    #[test]
    fn reject_empty_field_list() {
        let input = VALID.replace(
            "fields = [\"ripe\", \"unripe\", \"black_bunch\", \"rotten\", \"long_stalk\", \"rat_damage\", \"loose_fruit\"]",
            "fields = []",
        );
        let err = EngineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("field list"));
    }

    #[test]
    fn reject_duplicate_field() {
        let input = VALID.replace(
            "fields = [\"ripe\", \"unripe\", \"black_bunch\", \"rotten\", \"long_stalk\", \"rat_damage\", \"loose_fruit\"]",
            "fields = [\"ripe\", \"ripe\"]",
        );
        let err = EngineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn reject_inverted_filter_window() {
        let input = VALID.replace("window_start = \"2025-05-01\"", "window_start = \"2025-07-01\"");
        let err = EngineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("window"));
    }

    #[test]
    fn reject_duplicate_estate() {
        let input = VALID.replace("id = \"EST02\"", "id = \"EST01\"");
        let err = EngineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("EST01"));
    }

    #[test]
    fn reject_estate_flag_without_filter_section() {
        let input = VALID
            .replace("[status_filter]\nwindow_start = \"2025-05-01\"\nwindow_end = \"2025-05-31\"\nrequired_status = \"704\"\n", "");
        let err = EngineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("status filter"));
    }

    #[test]
    fn reject_bad_priority_role() {
        let input = VALID.replace(
            "[roles.tags]",
            "[roles]\nverifier_priority = [\"creator\"]\n\n[roles.tags]",
        );
        let err = EngineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("non-verifier"));
    }
}
