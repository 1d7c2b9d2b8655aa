//! Permission flags and the consent state held over them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConsentError;

/// A low-level consent switch understood by the signaling API.
///
/// Declaration order is the canonical order used for iteration and
/// serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionFlag {
    AnalyticsStorage,
    AdStorage,
    AdUserData,
    AdPersonalization,
    FunctionalityStorage,
}

impl PermissionFlag {
    /// Every managed flag, in canonical order.
    pub const ALL: [PermissionFlag; 5] = [
        PermissionFlag::AnalyticsStorage,
        PermissionFlag::AdStorage,
        PermissionFlag::AdUserData,
        PermissionFlag::AdPersonalization,
        PermissionFlag::FunctionalityStorage,
    ];

    /// The flag fixed to `granted` by policy.
    pub const PINNED: PermissionFlag = PermissionFlag::FunctionalityStorage;

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionFlag::AnalyticsStorage => "analytics_storage",
            PermissionFlag::AdStorage => "ad_storage",
            PermissionFlag::AdUserData => "ad_user_data",
            PermissionFlag::AdPersonalization => "ad_personalization",
            PermissionFlag::FunctionalityStorage => "functionality_storage",
        }
    }

    pub fn is_pinned(self) -> bool {
        self == Self::PINNED
    }

    /// Flags the user actually decides on (everything but the pinned flag).
    pub fn optional() -> impl Iterator<Item = PermissionFlag> {
        Self::ALL.into_iter().filter(|flag| !flag.is_pinned())
    }
}

impl fmt::Display for PermissionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionFlag {
    type Err = ConsentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| ConsentError::InvalidInput(format!("unknown permission flag {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentValue {
    Granted,
    Denied,
}

impl ConsentValue {
    pub fn is_granted(self) -> bool {
        self == ConsentValue::Granted
    }

    pub fn from_granted(granted: bool) -> Self {
        if granted {
            ConsentValue::Granted
        } else {
            ConsentValue::Denied
        }
    }
}

/// Consent value for every managed flag.
///
/// A state is always total: constructors fill absent flags with `denied`.
/// Pinning the policy flag is a separate, explicit step ([`Self::with_pinned`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionState {
    values: BTreeMap<PermissionFlag, ConsentValue>,
}

impl PermissionState {
    /// Every flag denied, the pinned flag included.
    pub fn denied() -> Self {
        Self::uniform(ConsentValue::Denied)
    }

    pub fn all_granted() -> Self {
        Self::uniform(ConsentValue::Granted)
    }

    /// Deny-by-default posture declared before any decision is known.
    pub fn policy_default() -> Self {
        Self::denied().with_pinned()
    }

    /// Build a total state from a partial set of values; absent flags are denied.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (PermissionFlag, ConsentValue)>,
    {
        let mut state = Self::denied();
        for (flag, value) in values {
            state.set(flag, value);
        }
        state
    }

    fn uniform(value: ConsentValue) -> Self {
        Self {
            values: PermissionFlag::ALL.into_iter().map(|flag| (flag, value)).collect(),
        }
    }

    /// Force the pinned flag to `granted`.
    pub fn with_pinned(mut self) -> Self {
        self.set(PermissionFlag::PINNED, ConsentValue::Granted);
        self
    }

    pub fn get(&self, flag: PermissionFlag) -> ConsentValue {
        self.values.get(&flag).copied().unwrap_or(ConsentValue::Denied)
    }

    pub fn is_granted(&self, flag: PermissionFlag) -> bool {
        self.get(flag).is_granted()
    }

    pub fn set(&mut self, flag: PermissionFlag, value: ConsentValue) {
        self.values.insert(flag, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (PermissionFlag, ConsentValue)> + '_ {
        self.values.iter().map(|(flag, value)| (*flag, *value))
    }

    /// Granted flags in canonical order.
    pub fn granted_flags(&self) -> impl Iterator<Item = PermissionFlag> + '_ {
        self.iter().filter(|(_, value)| value.is_granted()).map(|(flag, _)| flag)
    }

    /// Granted flags that reflect a user grant rather than policy.
    pub fn consented_flags(&self) -> impl Iterator<Item = PermissionFlag> + '_ {
        self.granted_flags().filter(|flag| !flag.is_pinned())
    }

    pub fn all_optional_denied(&self) -> bool {
        PermissionFlag::optional().all(|flag| !self.is_granted(flag))
    }
}

impl Default for PermissionState {
    fn default() -> Self {
        Self::policy_default()
    }
}

impl<'de> Deserialize<'de> for PermissionState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Unknown keys are tolerated so that records written with a wider
        // flag set still load; unknown values are not.
        let raw = BTreeMap::<String, ConsentValue>::deserialize(deserializer)?;
        Ok(Self::from_values(
            raw.into_iter()
                .filter_map(|(key, value)| key.parse::<PermissionFlag>().ok().map(|flag| (flag, value))),
        ))
    }
}
