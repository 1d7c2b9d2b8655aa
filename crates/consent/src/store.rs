//! Persistent consent store.
//!
//! One JSON record per browser profile, kept under a versioned key. Corrupt
//! records are purged on read; storage failures surface as errors on write
//! and as "no record" on read.

use serde::{Deserialize, Serialize};

use crate::clock::to_rfc3339;
use crate::diagnostics::Diagnostics;
use crate::error::{ConsentError, Result};
use crate::permission::PermissionState;
use crate::storage::ConsentSlot;

/// Record schema version, embedded in the storage key.
pub const CONSENT_RECORD_VERSION: &str = "v1";

/// Storage key for the current record schema.
pub const STORAGE_KEY: &str = "consent_booster.user_consent.v1";

/// The persisted unit of a user decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConsentRecord {
    pub state: PermissionState,
    /// Write instant, epoch milliseconds.
    pub timestamp: i64,
    /// Whether every optional flag was denied when the record was written.
    #[serde(rename = "allDenied", default)]
    pub all_optional_denied: bool,
}

impl StoredConsentRecord {
    pub fn new(state: PermissionState, timestamp: i64) -> Self {
        let all_optional_denied = state.all_optional_denied();
        Self {
            state,
            timestamp,
            all_optional_denied,
        }
    }

    /// Decode a raw slot value, rejecting records without a usable timestamp.
    pub fn parse(raw: &str) -> Result<Self> {
        let record: StoredConsentRecord = serde_json::from_str(raw)
            .map_err(|error| ConsentError::CorruptRecord(error.to_string()))?;
        if record.timestamp <= 0 {
            return Err(ConsentError::CorruptRecord(format!(
                "invalid timestamp {}",
                record.timestamp
            )));
        }
        Ok(record)
    }
}

pub struct ConsentStore {
    slot: Box<dyn ConsentSlot>,
    key: String,
    diagnostics: Diagnostics,
}

impl ConsentStore {
    pub fn new(slot: Box<dyn ConsentSlot>, key: impl Into<String>, diagnostics: Diagnostics) -> Self {
        Self {
            slot,
            key: key.into(),
            diagnostics,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn slot(&self) -> &dyn ConsentSlot {
        self.slot.as_ref()
    }

    /// Read the stored record.
    ///
    /// Returns `None` when nothing is stored, when the slot cannot be read,
    /// or when the stored value is corrupt. Corrupt and unreadable entries
    /// are removed.
    pub fn load(&mut self) -> Option<StoredConsentRecord> {
        let raw = match self.slot.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                self.diagnostics
                    .error(&format!("error loading consent: {error}. Removing stored data."));
                self.purge();
                return None;
            }
        };

        match StoredConsentRecord::parse(&raw) {
            Ok(record) => Some(record),
            Err(error) => {
                self.diagnostics.warn(&format!(
                    "invalid or outdated stored consent format ({error}). Treating as no consent."
                ));
                self.purge();
                None
            }
        }
    }

    /// Persist a decision made at `now`.
    pub fn save(&mut self, state: &PermissionState, now: i64) -> Result<StoredConsentRecord> {
        let record = StoredConsentRecord::new(state.clone(), now);
        let raw = serde_json::to_string(&record)?;
        self.slot.set(&self.key, &raw)?;
        self.diagnostics.info_with(
            &format!(
                "consent saved at {} (all optional denied: {})",
                to_rfc3339(now),
                record.all_optional_denied
            ),
            &record,
        );
        Ok(record)
    }

    /// Remove the stored record; failures are logged and otherwise ignored.
    pub fn purge(&mut self) {
        if let Err(error) = self.slot.remove(&self.key) {
            self.diagnostics
                .error(&format!("failed to remove stored consent: {error}"));
        }
    }
}
