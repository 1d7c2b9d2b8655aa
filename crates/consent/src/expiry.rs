//! Expiry policy for stored consent.
//!
//! Two independent timers apply to a stored record: the maximum age after
//! which no decision is trusted, and a shorter refresh interval after which
//! users who denied every optional flag are asked again. Both comparisons
//! are strict: a record exactly at a limit is still within it.

use serde::{Deserialize, Serialize};

use crate::clock::MS_IN_DAY;
use crate::permission::PermissionState;
use crate::store::StoredConsentRecord;

pub const DEFAULT_MAX_AGE_DAYS: f64 = 365.0;
pub const DEFAULT_REJECTION_REFRESH_DAYS: f64 = 182.0;

/// How long any stored decision stays trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxAge {
    Days(f64),
    Never,
}

impl MaxAge {
    pub fn as_ms(self) -> Option<f64> {
        match self {
            MaxAge::Days(days) => Some(days * MS_IN_DAY as f64),
            MaxAge::Never => None,
        }
    }
}

impl Default for MaxAge {
    fn default() -> Self {
        MaxAge::Days(DEFAULT_MAX_AGE_DAYS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryVerdict {
    /// The record holds; carries its state with the pinned flag re-asserted.
    Valid(PermissionState),
    /// Older than the maximum age.
    Expired,
    /// Everything optional was denied and the refresh interval has passed.
    EligibleForReprompt,
}

impl ExpiryVerdict {
    pub fn into_valid(self) -> Option<PermissionState> {
        match self {
            ExpiryVerdict::Valid(state) => Some(state),
            ExpiryVerdict::Expired | ExpiryVerdict::EligibleForReprompt => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryPolicy {
    pub max_age: MaxAge,
    pub rejection_refresh_days: f64,
}

impl ExpiryPolicy {
    pub fn new(max_age: MaxAge, rejection_refresh_days: f64) -> Self {
        Self {
            max_age,
            rejection_refresh_days,
        }
    }

    pub fn rejection_refresh_ms(&self) -> f64 {
        self.rejection_refresh_days * MS_IN_DAY as f64
    }

    pub fn evaluate(&self, record: &StoredConsentRecord, now: i64) -> ExpiryVerdict {
        let elapsed = now.saturating_sub(record.timestamp) as f64;

        if let Some(max_age_ms) = self.max_age.as_ms() {
            if elapsed > max_age_ms {
                return ExpiryVerdict::Expired;
            }
        }

        if record.all_optional_denied && elapsed > self.rejection_refresh_ms() {
            return ExpiryVerdict::EligibleForReprompt;
        }

        ExpiryVerdict::Valid(record.state.clone().with_pinned())
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(MaxAge::default(), DEFAULT_REJECTION_REFRESH_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{ConsentValue, PermissionFlag};

    const NOW: i64 = 1_700_000_000_000;

    fn record(state: PermissionState, age_ms: i64) -> StoredConsentRecord {
        StoredConsentRecord::new(state, NOW - age_ms)
    }

    fn analytics_only() -> PermissionState {
        PermissionState::from_values([(PermissionFlag::AnalyticsStorage, ConsentValue::Granted)])
    }

    #[test]
    fn older_than_max_age_is_expired() {
        let policy = ExpiryPolicy::default();
        let rec = record(analytics_only(), 366 * MS_IN_DAY);
        assert_eq!(policy.evaluate(&rec, NOW), ExpiryVerdict::Expired);
    }

    #[test]
    fn just_inside_max_age_is_valid() {
        let policy = ExpiryPolicy::default();
        let rec = record(analytics_only(), 365 * MS_IN_DAY - 1);
        assert!(matches!(policy.evaluate(&rec, NOW), ExpiryVerdict::Valid(_)));
    }

    #[test]
    fn exactly_at_max_age_is_valid() {
        let policy = ExpiryPolicy::default();
        let rec = record(analytics_only(), 365 * MS_IN_DAY);
        assert!(matches!(policy.evaluate(&rec, NOW), ExpiryVerdict::Valid(_)));
    }

    #[test]
    fn never_expiring_policy_keeps_old_records() {
        let policy = ExpiryPolicy::new(MaxAge::Never, DEFAULT_REJECTION_REFRESH_DAYS);
        let rec = record(analytics_only(), 10_000 * MS_IN_DAY);
        assert!(matches!(policy.evaluate(&rec, NOW), ExpiryVerdict::Valid(_)));
    }

    #[test]
    fn fractional_days_are_honored() {
        let policy = ExpiryPolicy::new(MaxAge::Days(0.5), DEFAULT_REJECTION_REFRESH_DAYS);
        let rec = record(analytics_only(), MS_IN_DAY / 2 + 1);
        assert_eq!(policy.evaluate(&rec, NOW), ExpiryVerdict::Expired);
    }

    #[test]
    fn all_denied_past_refresh_is_reprompt() {
        let policy = ExpiryPolicy::default();
        let rec = record(PermissionState::policy_default(), 200 * MS_IN_DAY);
        assert!(rec.all_optional_denied);
        assert_eq!(policy.evaluate(&rec, NOW), ExpiryVerdict::EligibleForReprompt);
    }

    #[test]
    fn all_denied_within_refresh_is_valid() {
        let policy = ExpiryPolicy::default();
        let rec = record(PermissionState::policy_default(), 0);
        assert_eq!(
            policy.evaluate(&rec, NOW),
            ExpiryVerdict::Valid(PermissionState::policy_default())
        );
    }

    #[test]
    fn partial_grant_ignores_refresh_interval() {
        let policy = ExpiryPolicy::default();
        let rec = record(analytics_only(), 200 * MS_IN_DAY);
        assert!(matches!(policy.evaluate(&rec, NOW), ExpiryVerdict::Valid(_)));
    }

    #[test]
    fn valid_state_reasserts_pinned_flag() {
        let policy = ExpiryPolicy::default();
        let mut rec = record(PermissionState::denied(), 0);
        rec.all_optional_denied = false;
        let state = policy.evaluate(&rec, NOW).into_valid().expect("valid");
        assert!(state.is_granted(PermissionFlag::FunctionalityStorage));
        assert!(!state.is_granted(PermissionFlag::AnalyticsStorage));
    }
}
