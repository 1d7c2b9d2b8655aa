//! Messages for the tag-management data layer and the queue they go through.

pub mod bus;

pub use bus::{BusDataLayer, BusSubscription};

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::permission::PermissionState;

pub const CONSENT_STATE_UPDATED_EVENT: &str = "consent_state_updated";
pub const TAG_MANAGER_START_EVENT: &str = "gtm.js";
pub const ANALYTICS_LOADED_EVENT: &str = "gtag.js_loaded";

/// A consent directive for the signaling API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentCommand {
    /// Provisional posture declared before anything else; listeners may hold
    /// for `wait_for_update_ms` waiting for an update.
    Default {
        state: PermissionState,
        wait_for_update_ms: u64,
    },
    Update {
        state: PermissionState,
    },
}

impl ConsentCommand {
    pub fn state(&self) -> &PermissionState {
        match self {
            ConsentCommand::Default { state, .. } | ConsentCommand::Update { state } => state,
        }
    }
}

/// Everything the engine appends to the data layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayerMessage {
    Consent(ConsentCommand),
    /// Broadcast of the full state after a change, for downstream integrations.
    ConsentStateUpdated { state: PermissionState },
    /// Tag-manager bootstrap marker pushed before its script is requested.
    TagManagerStart { start_ms: i64 },
    AnalyticsLoaded,
    AnalyticsJs { at_ms: i64 },
    AnalyticsConfig { measurement_id: String },
}

impl DataLayerMessage {
    /// Render the message in the shape the tag runtime expects on its queue.
    pub fn to_json(&self) -> Value {
        match self {
            DataLayerMessage::Consent(ConsentCommand::Default {
                state,
                wait_for_update_ms,
            }) => {
                let mut payload = state_object(state);
                payload.insert("wait_for_update".to_string(), json!(wait_for_update_ms));
                json!(["consent", "default", payload])
            }
            DataLayerMessage::Consent(ConsentCommand::Update { state }) => {
                json!(["consent", "update", state_object(state)])
            }
            DataLayerMessage::ConsentStateUpdated { state } => json!({
                "event": CONSENT_STATE_UPDATED_EVENT,
                "updated_consent_state": state_object(state),
            }),
            DataLayerMessage::TagManagerStart { start_ms } => json!({
                "gtm.start": start_ms,
                "event": TAG_MANAGER_START_EVENT,
            }),
            DataLayerMessage::AnalyticsLoaded => json!({ "event": ANALYTICS_LOADED_EVENT }),
            DataLayerMessage::AnalyticsJs { at_ms } => json!(["js", at_ms]),
            DataLayerMessage::AnalyticsConfig { measurement_id } => {
                json!(["config", measurement_id])
            }
        }
    }
}

fn state_object(state: &PermissionState) -> Map<String, Value> {
    state
        .iter()
        .map(|(flag, value)| (flag.as_str().to_string(), json!(value)))
        .collect()
}

/// Append-only message queue shared with the tag runtime.
///
/// A failing push means the host integration is broken; callers propagate it.
pub trait DataLayer {
    fn push(&mut self, message: DataLayerMessage) -> Result<()>;
}

/// Data layer that keeps every message in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingDataLayer {
    messages: Vec<DataLayerMessage>,
}

impl RecordingDataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[DataLayerMessage] {
        &self.messages
    }

    pub fn consent_commands(&self) -> Vec<&ConsentCommand> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                DataLayerMessage::Consent(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    /// States carried by `consent_state_updated` broadcasts, in order.
    pub fn broadcasts(&self) -> Vec<&PermissionState> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                DataLayerMessage::ConsentStateUpdated { state } => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn to_json(&self) -> Vec<Value> {
        self.messages.iter().map(DataLayerMessage::to_json).collect()
    }
}

impl DataLayer for RecordingDataLayer {
    fn push(&mut self, message: DataLayerMessage) -> Result<()> {
        self.messages.push(message);
        Ok(())
    }
}
