//! Per-check configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Check;

/// Which checks the user disabled.
///
/// Keys have the form `skip-<config key suffix>`, e.g. `skip-check-ram`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightConfig {
    #[serde(default)]
    pub skip_checks: BTreeSet<String>,
}

impl PreflightConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the check behind `key`.
    pub fn skip(mut self, key: impl Into<String>) -> Self {
        self.skip_checks.insert(key.into());
        self
    }

    pub fn is_skipped(&self, check: &Check) -> bool {
        check
            .config_key()
            .is_some_and(|key| self.skip_checks.contains(&key))
    }
}
