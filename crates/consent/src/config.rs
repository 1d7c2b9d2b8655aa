use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::category::CategoryMapping;
use crate::error::{ConsentError, Result};
use crate::expiry::{ExpiryPolicy, MaxAge, DEFAULT_MAX_AGE_DAYS, DEFAULT_REJECTION_REFRESH_DAYS};
use crate::store::STORAGE_KEY;

pub const DEFAULT_WAIT_FOR_UPDATE_MS: u64 = 500;

pub const ATTR_TAG_MANAGER_ID: &str = "data-cb-gtm-id";
pub const ATTR_ANALYTICS_ID: &str = "data-cb-ga4-id";
pub const ATTR_WAIT_FOR_UPDATE: &str = "data-cb-wait-for-update";
pub const ATTR_DEV_MODE: &str = "data-cb-dev-mode";
pub const ATTR_SEED_DEFAULT: &str = "data-cb-default-state-updated";
pub const ATTR_FORCE_SCRIPT_GATE: &str = "data-cb-force-manage-plain-scripts";
pub const ATTR_BROADCAST_ON_SEEDED: &str = "data-cb-broadcast-on-seeded-default";
pub const ATTR_MAX_AGE_DAYS: &str = "data-cb-consent-max-age-days";
pub const ATTR_REJECTION_REFRESH_DAYS: &str = "data-cb-rejection-refresh-days";

/// Attributes of the host script element that carries the configuration.
pub trait HostAttributes {
    fn attribute(&self, name: &str) -> Option<String>;
}

impl HostAttributes for HashMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl HostAttributes for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Startup behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentStrategy {
    /// Declare a valid stored decision as the default itself.
    pub seed_default_from_storage: bool,
    /// Gate placeholder scripts even when a tag manager is present.
    pub force_script_gate: bool,
    /// Broadcast `consent_state_updated` when the default was seeded from storage.
    pub broadcast_on_seeded_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    pub tag_manager_id: Option<String>,
    pub analytics_id: Option<String>,
    pub wait_for_update_ms: u64,
    pub dev_mode: bool,
    pub strategy: ConsentStrategy,
    pub max_age: MaxAge,
    pub rejection_refresh_days: f64,
    pub storage_key: String,
    pub category_mapping: CategoryMapping,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            tag_manager_id: None,
            analytics_id: None,
            wait_for_update_ms: DEFAULT_WAIT_FOR_UPDATE_MS,
            dev_mode: false,
            strategy: ConsentStrategy::default(),
            max_age: MaxAge::default(),
            rejection_refresh_days: DEFAULT_REJECTION_REFRESH_DAYS,
            storage_key: STORAGE_KEY.to_string(),
            category_mapping: CategoryMapping::default(),
        }
    }
}

impl ConsentConfig {
    /// Read configuration from the host script, failing when the host
    /// cannot be identified.
    pub fn from_host(host: Option<&dyn HostAttributes>) -> Result<Self> {
        let host = host.ok_or_else(|| {
            ConsentError::MisconfiguredHost("script tag not identified".to_string())
        })?;
        Ok(Self::from_attributes(host))
    }

    pub fn from_attributes(host: &dyn HostAttributes) -> Self {
        let flag = |name: &str| host.attribute(name).as_deref() == Some("true");
        let id = |name: &str| host.attribute(name).filter(|value| !value.trim().is_empty());

        Self {
            tag_manager_id: id(ATTR_TAG_MANAGER_ID),
            analytics_id: id(ATTR_ANALYTICS_ID),
            wait_for_update_ms: host
                .attribute(ATTR_WAIT_FOR_UPDATE)
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(DEFAULT_WAIT_FOR_UPDATE_MS),
            dev_mode: flag(ATTR_DEV_MODE),
            strategy: ConsentStrategy {
                seed_default_from_storage: flag(ATTR_SEED_DEFAULT),
                force_script_gate: flag(ATTR_FORCE_SCRIPT_GATE),
                broadcast_on_seeded_default: flag(ATTR_BROADCAST_ON_SEEDED),
            },
            max_age: parse_max_age(host.attribute(ATTR_MAX_AGE_DAYS).as_deref()),
            rejection_refresh_days: parse_refresh_days(
                host.attribute(ATTR_REJECTION_REFRESH_DAYS).as_deref(),
            ),
            ..Self::default()
        }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(self.max_age, self.rejection_refresh_days)
    }

    /// Placeholder scripts are gated unless a tag manager owns them.
    pub fn script_gate_enabled(&self) -> bool {
        self.strategy.force_script_gate || self.tag_manager_id.is_none()
    }
}

/// Absent means the default age; an empty value means the decision never
/// expires.
fn parse_max_age(raw: Option<&str>) -> MaxAge {
    match raw {
        None => MaxAge::Days(DEFAULT_MAX_AGE_DAYS),
        Some("") => MaxAge::Never,
        Some(raw) => MaxAge::Days(parse_days(raw).unwrap_or(DEFAULT_MAX_AGE_DAYS)),
    }
}

fn parse_refresh_days(raw: Option<&str>) -> f64 {
    raw.filter(|raw| !raw.is_empty())
        .and_then(parse_days)
        .unwrap_or(DEFAULT_REJECTION_REFRESH_DAYS)
}

fn parse_days(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|days| days.is_finite() && *days >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_host_is_misconfigured() {
        let err = ConsentConfig::from_host(None).expect_err("no host");
        match err {
            ConsentError::MisconfiguredHost(_) => {}
            other => panic!("expected MisconfiguredHost, got {other:?}"),
        }
    }

    #[test]
    fn empty_attributes_give_defaults() {
        let config = ConsentConfig::from_attributes(&attrs(&[]));
        assert_eq!(config, ConsentConfig::default());
        assert_eq!(config.max_age, MaxAge::Days(365.0));
        assert_eq!(config.rejection_refresh_days, 182.0);
        assert!(config.script_gate_enabled());
    }

    #[test]
    fn reads_every_attribute() {
        let config = ConsentConfig::from_attributes(&attrs(&[
            (ATTR_TAG_MANAGER_ID, "GTM-ABC123"),
            (ATTR_WAIT_FOR_UPDATE, "750"),
            (ATTR_DEV_MODE, "true"),
            (ATTR_SEED_DEFAULT, "true"),
            (ATTR_FORCE_SCRIPT_GATE, "false"),
            (ATTR_BROADCAST_ON_SEEDED, "true"),
            (ATTR_MAX_AGE_DAYS, "30.5"),
            (ATTR_REJECTION_REFRESH_DAYS, "7"),
        ]));
        assert_eq!(config.tag_manager_id.as_deref(), Some("GTM-ABC123"));
        assert_eq!(config.wait_for_update_ms, 750);
        assert!(config.dev_mode);
        assert!(config.strategy.seed_default_from_storage);
        assert!(!config.strategy.force_script_gate);
        assert!(config.strategy.broadcast_on_seeded_default);
        assert_eq!(config.max_age, MaxAge::Days(30.5));
        assert_eq!(config.rejection_refresh_days, 7.0);
        assert!(!config.script_gate_enabled());
    }

    #[test]
    fn empty_max_age_never_expires() {
        let config = ConsentConfig::from_attributes(&attrs(&[(ATTR_MAX_AGE_DAYS, "")]));
        assert_eq!(config.max_age, MaxAge::Never);
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let config = ConsentConfig::from_attributes(&attrs(&[
            (ATTR_MAX_AGE_DAYS, "soon"),
            (ATTR_REJECTION_REFRESH_DAYS, ""),
            (ATTR_WAIT_FOR_UPDATE, "fast"),
        ]));
        assert_eq!(config.max_age, MaxAge::Days(DEFAULT_MAX_AGE_DAYS));
        assert_eq!(config.rejection_refresh_days, DEFAULT_REJECTION_REFRESH_DAYS);
        assert_eq!(config.wait_for_update_ms, DEFAULT_WAIT_FOR_UPDATE_MS);
    }

    #[test]
    fn forced_gate_overrides_tag_manager() {
        let config = ConsentConfig::from_attributes(&attrs(&[
            (ATTR_TAG_MANAGER_ID, "GTM-ABC123"),
            (ATTR_FORCE_SCRIPT_GATE, "true"),
        ]));
        assert!(config.script_gate_enabled());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: ConsentConfig = serde_json::from_str(
            r#"{"analytics_id": "G-XYZ", "max_age": "never", "strategy": {"force_script_gate": true}}"#,
        )
        .unwrap();
        assert_eq!(config.analytics_id.as_deref(), Some("G-XYZ"));
        assert_eq!(config.max_age, MaxAge::Never);
        assert!(config.strategy.force_script_gate);
        assert_eq!(config.storage_key, STORAGE_KEY);
    }
}
