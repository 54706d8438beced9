use std::collections::BTreeMap;

use crate::config::RolesConfig;
use crate::model::Role;

/// Maps raw record tags to functional roles.
///
/// The mapping is injected configuration, not a literal: tag semantics have
/// drifted across datasets, so the resolver must be swappable without
/// touching the match detector.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    tags: BTreeMap<String, Role>,
    verifier_priority: Vec<Role>,
}

impl RoleResolver {
    pub fn from_config(config: &RolesConfig) -> Self {
        Self {
            tags: config.tags.clone(),
            verifier_priority: config.verifier_priority.clone(),
        }
    }

    /// Unknown tags resolve to `Unclassified`; never an error.
    pub fn resolve(&self, tag: &str) -> Role {
        self.tags.get(tag).copied().unwrap_or(Role::Unclassified)
    }

    /// Verifier selection order, e.g. primary before secondary.
    pub fn verifier_priority(&self) -> &[Role] {
        &self.verifier_priority
    }
}
