//! Migration inclusion policy and filtering
//!
//! A deployment decides which migrations from the shared pool apply to its
//! tenants with a mode and a list of logical names. The policy is global:
//! every tenant in one orchestration run sees the same eligible set.

use std::collections::BTreeSet;

use serde::Serialize;
use strum_macros::{Display, IntoStaticStr};

use crate::discovery::MigrationFile;

/// Whether the configured names are an allow-list or a deny-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Only the configured migrations are eligible.
    Only,
    /// Every migration except the configured ones is eligible.
    Except,
}

impl PolicyMode {
    /// Interpret a configured behavior string.
    ///
    /// Exactly `"only"` selects [`PolicyMode::Only`]; any other value,
    /// including an empty string, selects [`PolicyMode::Except`].
    pub fn from_behavior(behavior: &str) -> Self {
        if behavior == "only" {
            PolicyMode::Only
        } else {
            PolicyMode::Except
        }
    }
}

/// Source of the per-deployment migration policy.
pub trait PolicyProvider {
    /// Logical names listed by the deployment.
    fn tenant_migrations(&self) -> BTreeSet<String>;

    /// Raw behavior string; see [`PolicyMode::from_behavior`].
    fn migration_behavior(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPolicy {
    pub mode: PolicyMode,
    pub configured_names: BTreeSet<String>,
}

impl MigrationPolicy {
    pub fn new<I, S>(mode: PolicyMode, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode,
            configured_names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Snapshot the policy from a provider.
    pub fn from_provider(provider: &dyn PolicyProvider) -> Self {
        Self {
            mode: PolicyMode::from_behavior(&provider.migration_behavior()),
            configured_names: provider.tenant_migrations(),
        }
    }

    /// An `except` policy with no names: everything is eligible.
    pub fn allow_all() -> Self {
        Self::new(PolicyMode::Except, Vec::<String>::new())
    }

    /// Whether a migration with the given logical name is eligible.
    pub fn admits(&self, logical_name: &str) -> bool {
        let listed = self.configured_names.contains(logical_name);
        match self.mode {
            PolicyMode::Only => listed,
            PolicyMode::Except => !listed,
        }
    }

    /// Select the eligible migrations, preserving input order.
    ///
    /// Duplicates in `available` are not collapsed: each file is judged on
    /// its own logical name.
    pub fn filter(&self, available: &[MigrationFile]) -> Vec<MigrationFile> {
        available
            .iter()
            .filter(|m| self.admits(&m.logical_name))
            .cloned()
            .collect()
    }
}

impl Default for MigrationPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn files(ids: &[&str]) -> Vec<MigrationFile> {
        ids.iter().map(|id| MigrationFile::from_identifier(*id)).collect()
    }

    fn ids(files: &[MigrationFile]) -> Vec<&str> {
        files.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_only_mode_keeps_listed() {
        let available = files(&[
            "2020_01_01_create_widgets_table.php",
            "2020_01_02_create_gadgets_table.php",
        ]);
        let policy = MigrationPolicy::new(PolicyMode::Only, ["create_widgets_table"]);

        assert_eq!(
            ids(&policy.filter(&available)),
            vec!["2020_01_01_create_widgets_table.php"]
        );
    }

    #[test]
    fn test_except_mode_drops_listed() {
        let available = files(&[
            "2020_01_01_create_widgets_table.php",
            "2020_01_02_create_gadgets_table.php",
        ]);
        let policy = MigrationPolicy::new(PolicyMode::Except, ["create_widgets_table"]);

        assert_eq!(
            ids(&policy.filter(&available)),
            vec!["2020_01_02_create_gadgets_table.php"]
        );
    }

    #[test]
    fn test_empty_only_policy_selects_nothing() {
        let available = files(&["2020_01_01_a.sql", "2020_01_02_b.sql"]);
        let policy = MigrationPolicy::new(PolicyMode::Only, Vec::<String>::new());
        assert!(policy.filter(&available).is_empty());
    }

    #[test]
    fn test_duplicates_pass_through() {
        let available = files(&["2020_01_01_a.sql", "2021_01_01_a.sql"]);
        let policy = MigrationPolicy::allow_all();
        assert_eq!(policy.filter(&available).len(), 2);
    }

    #[test]
    fn test_behavior_string_mapping() {
        assert_eq!(PolicyMode::from_behavior("only"), PolicyMode::Only);
        assert_eq!(PolicyMode::from_behavior("except"), PolicyMode::Except);
        assert_eq!(PolicyMode::from_behavior(""), PolicyMode::Except);
        assert_eq!(PolicyMode::from_behavior("ONLY"), PolicyMode::Except);
        assert_eq!(PolicyMode::Only.to_string(), "only");
    }

    struct FixedProvider;

    impl PolicyProvider for FixedProvider {
        fn tenant_migrations(&self) -> BTreeSet<String> {
            ["create_widgets_table".to_string()].into_iter().collect()
        }

        fn migration_behavior(&self) -> String {
            "only".to_string()
        }
    }

    #[test]
    fn test_from_provider() {
        let policy = MigrationPolicy::from_provider(&FixedProvider);
        assert_eq!(policy.mode, PolicyMode::Only);
        assert!(policy.admits("create_widgets_table"));
        assert!(!policy.admits("create_gadgets_table"));
    }

    fn arb_names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-e]{1,2}", 0..12)
    }

    proptest! {
        #[test]
        fn prop_filter_matches_membership(
            names in arb_names(),
            configured in prop::collection::btree_set("[a-e]{1,2}", 0..6),
            only in any::<bool>(),
        ) {
            let available: Vec<MigrationFile> = names
                .iter()
                .enumerate()
                .map(|(i, n)| MigrationFile::from_identifier(format!("2020_01_01_{i:06}_{n}.sql")))
                .collect();
            let mode = if only { PolicyMode::Only } else { PolicyMode::Except };
            let policy = MigrationPolicy { mode, configured_names: configured.clone() };

            let expected: Vec<MigrationFile> = available
                .iter()
                .filter(|m| configured.contains(&m.logical_name) == only)
                .cloned()
                .collect();

            prop_assert_eq!(policy.filter(&available), expected);
        }

        #[test]
        fn prop_filter_never_reorders(
            names in arb_names(),
            configured in prop::collection::btree_set("[a-e]{1,2}", 0..6),
        ) {
            let available: Vec<MigrationFile> = names
                .iter()
                .enumerate()
                .map(|(i, n)| MigrationFile::from_identifier(format!("{i:04}_{n}.sql")))
                .collect();
            let policy = MigrationPolicy::new(PolicyMode::Except, configured);

            let kept = policy.filter(&available);
            let positions: Vec<usize> = kept
                .iter()
                .map(|m| available.iter().position(|a| a == m).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
