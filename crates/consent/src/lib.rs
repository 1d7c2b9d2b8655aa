pub mod error;
pub mod diagnostics;
pub mod clock;

pub mod permission;
pub mod category;
pub mod storage;
pub mod store;
pub mod expiry;
pub mod signal;
pub mod gate;
pub mod tags;
pub mod ui;
pub mod config;
pub mod engine;

pub use crate::config::{ConsentConfig, ConsentStrategy, HostAttributes};
pub use crate::engine::{ConsentEngine, ConsentPage, EnginePhase};
pub use crate::error::{ConsentError, Result};
pub use crate::expiry::{ExpiryPolicy, ExpiryVerdict, MaxAge};
pub use crate::permission::{ConsentValue, PermissionFlag, PermissionState};
pub use crate::store::{ConsentStore, StoredConsentRecord};
