//! Mapping between user-facing consent categories and permission flags.

use serde::{Deserialize, Serialize};

use crate::error::{ConsentError, Result};
use crate::permission::{ConsentValue, PermissionFlag, PermissionState};

pub const ANALYTICS: &str = "analytics";
pub const MARKETING: &str = "marketing";
pub const PREFERENCES: &str = "preferences";

/// One category and the flags it controls, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub flags: Vec<PermissionFlag>,
}

/// Static category configuration, fixed once the engine starts.
///
/// Entry order is significant: script activation walks categories in
/// this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CategoryEntry>", into = "Vec<CategoryEntry>")]
pub struct CategoryMapping {
    entries: Vec<CategoryEntry>,
}

impl CategoryMapping {
    /// Build a mapping, rejecting duplicate category names.
    pub fn new(entries: Vec<CategoryEntry>) -> Result<Self> {
        for (index, entry) in entries.iter().enumerate() {
            if entry.name.is_empty() {
                return Err(ConsentError::InvalidInput("empty category name".to_string()));
            }
            if entries[..index].iter().any(|other| other.name == entry.name) {
                return Err(ConsentError::InvalidInput(format!(
                    "duplicate category {}",
                    entry.name
                )));
            }
            if entry.flags.is_empty() {
                tracing::warn!("category {} controls no flags and will never be granted", entry.name);
            }
        }
        Ok(Self { entries })
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.entry(category).is_some()
    }

    /// Flags controlled by `category`; empty for unknown categories.
    pub fn flags_for(&self, category: &str) -> &[PermissionFlag] {
        self.entry(category).map(|entry| entry.flags.as_slice()).unwrap_or(&[])
    }

    /// Categories whose mapping includes `flag`, in mapping order.
    pub fn categories_controlling(&self, flag: PermissionFlag) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.flags.contains(&flag))
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// A category is granted when it maps to at least one flag and every
    /// mapped flag is granted.
    pub fn is_category_granted(&self, category: &str, state: &PermissionState) -> bool {
        let flags = self.flags_for(category);
        !flags.is_empty() && flags.iter().all(|flag| state.is_granted(*flag))
    }

    /// Translate per-category choices into a total state.
    ///
    /// Flags of chosen categories are granted, everything else is denied.
    /// Unknown categories are ignored. The pinned flag is left as chosen.
    pub fn state_from_choices<'a, I>(&self, choices: I) -> PermissionState
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut state = PermissionState::denied();
        for (category, chosen) in choices {
            if !chosen {
                continue;
            }
            for flag in self.flags_for(category) {
                state.set(*flag, ConsentValue::Granted);
            }
        }
        state
    }

    fn entry(&self, category: &str) -> Option<&CategoryEntry> {
        self.entries.iter().find(|entry| entry.name == category)
    }
}

impl Default for CategoryMapping {
    fn default() -> Self {
        Self {
            entries: vec![
                CategoryEntry {
                    name: ANALYTICS.to_string(),
                    flags: vec![PermissionFlag::AnalyticsStorage],
                },
                CategoryEntry {
                    name: MARKETING.to_string(),
                    flags: vec![
                        PermissionFlag::AdStorage,
                        PermissionFlag::AdUserData,
                        PermissionFlag::AdPersonalization,
                    ],
                },
                CategoryEntry {
                    name: PREFERENCES.to_string(),
                    flags: vec![PermissionFlag::FunctionalityStorage],
                },
            ],
        }
    }
}

impl TryFrom<Vec<CategoryEntry>> for CategoryMapping {
    type Error = ConsentError;

    fn try_from(entries: Vec<CategoryEntry>) -> Result<Self> {
        Self::new(entries)
    }
}

impl From<CategoryMapping> for Vec<CategoryEntry> {
    fn from(mapping: CategoryMapping) -> Self {
        mapping.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, flags: &[PermissionFlag]) -> CategoryEntry {
        CategoryEntry {
            name: name.to_string(),
            flags: flags.to_vec(),
        }
    }

    #[test]
    fn unknown_category_is_inert() {
        let mapping = CategoryMapping::default();
        assert!(mapping.flags_for("social").is_empty());
        assert!(!mapping.is_category_granted("social", &PermissionState::all_granted()));
    }

    #[test]
    fn marketing_requires_every_flag() {
        let mapping = CategoryMapping::default();
        let mut state = PermissionState::policy_default();
        state.set(PermissionFlag::AdStorage, ConsentValue::Granted);
        state.set(PermissionFlag::AdUserData, ConsentValue::Granted);
        assert!(!mapping.is_category_granted(MARKETING, &state));

        state.set(PermissionFlag::AdPersonalization, ConsentValue::Granted);
        assert!(mapping.is_category_granted(MARKETING, &state));
    }

    #[test]
    fn empty_category_is_never_granted() {
        let mapping = CategoryMapping::new(vec![entry("empty", &[])]).unwrap();
        assert!(!mapping.is_category_granted("empty", &PermissionState::all_granted()));
    }

    #[test]
    fn flag_may_belong_to_many_categories() {
        let mapping = CategoryMapping::new(vec![
            entry("ads", &[PermissionFlag::AdStorage]),
            entry("measurement", &[PermissionFlag::AnalyticsStorage, PermissionFlag::AdStorage]),
        ])
        .unwrap();
        assert_eq!(
            mapping.categories_controlling(PermissionFlag::AdStorage),
            vec!["ads", "measurement"]
        );
        assert!(mapping
            .categories_controlling(PermissionFlag::FunctionalityStorage)
            .is_empty());
    }

    #[test]
    fn duplicate_category_rejected() {
        let result = CategoryMapping::new(vec![
            entry("analytics", &[PermissionFlag::AnalyticsStorage]),
            entry("analytics", &[PermissionFlag::AdStorage]),
        ]);
        assert!(matches!(result, Err(ConsentError::InvalidInput(_))));
    }

    #[test]
    fn choices_grant_only_chosen_categories() {
        let mapping = CategoryMapping::default();
        let state = mapping.state_from_choices([(ANALYTICS, true), (MARKETING, false), ("social", true)]);
        assert!(state.is_granted(PermissionFlag::AnalyticsStorage));
        assert!(!state.is_granted(PermissionFlag::AdStorage));
        assert!(!state.is_granted(PermissionFlag::FunctionalityStorage));
    }

    #[test]
    fn mapping_deserializes_from_entry_list() {
        let mapping: CategoryMapping = serde_json::from_str(
            r#"[{"name": "analytics", "flags": ["analytics_storage"]}]"#,
        )
        .unwrap();
        assert_eq!(mapping.flags_for("analytics"), &[PermissionFlag::AnalyticsStorage]);
        assert_eq!(mapping.categories().count(), 1);
    }
}
