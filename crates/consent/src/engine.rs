//! Consent reconciliation engine.
//!
//! Drives one page lifetime: declare a default posture, reconcile it with
//! any stored decision, then apply user decisions as they arrive. The
//! default directive is always the first consent message on the data layer.


use crate::category::CategoryMapping;
use crate::clock::Clock;
use crate::config::{ConsentConfig, HostAttributes};
use crate::diagnostics::Diagnostics;
use crate::error::{ConsentError, Result};
use crate::expiry::{ExpiryPolicy, ExpiryVerdict};
use crate::gate::{ScriptGate, ScriptHost};
use crate::permission::{PermissionFlag, PermissionState};
use crate::signal::{ConsentCommand, DataLayer, DataLayerMessage};
use crate::storage::ConsentSlot;
use crate::store::ConsentStore;
use crate::tags::{TagKind, TagLoader, TagScriptRequest};
use crate::ui::{reflect_state, ConsentSurface, UiAction, SETTINGS_MODAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Uninitialized,
    DefaultDeclared,
    AwaitingUserInput,
    Reconciled,
}

/// Page-side collaborators handed to the engine.
pub struct ConsentPage<D, H, U> {
    pub data_layer: D,
    pub scripts: H,
    pub surface: U,
    pub slot: Box<dyn ConsentSlot>,
    pub clock: Box<dyn Clock>,
}

pub struct ConsentEngine<D, H, U> {
    config: ConsentConfig,
    policy: ExpiryPolicy,
    store: ConsentStore,
    gate: ScriptGate,
    data_layer: D,
    scripts: H,
    surface: U,
    clock: Box<dyn Clock>,
    diagnostics: Diagnostics,
    state: PermissionState,
    phase: EnginePhase,
    seeded_from_storage: bool,
    /// Outcome of the single startup read of the stored decision.
    startup_decision: Option<Option<PermissionState>>,
    ui_bound: bool,
}

impl<D, H, U> ConsentEngine<D, H, U>
where
    D: DataLayer,
    H: ScriptHost,
    U: ConsentSurface,
{
    pub fn new(config: ConsentConfig, page: ConsentPage<D, H, U>) -> Self {
        let diagnostics = Diagnostics::new(config.dev_mode);
        let gate_enabled = config.script_gate_enabled();
        let store = ConsentStore::new(page.slot, config.storage_key.clone(), diagnostics);
        let gate = ScriptGate::new(config.category_mapping.clone(), gate_enabled, diagnostics);

        diagnostics.info_with("consent engine initialized with config", &config);
        if config.strategy.seed_default_from_storage {
            diagnostics.warn("strategy: default consent state will be seeded from storage");
        }
        if config.strategy.force_script_gate && config.tag_manager_id.is_some() {
            diagnostics.warn(
                "strategy: gating placeholder scripts alongside the tag manager; ensure no conflicts",
            );
        }
        diagnostics.info(&format!("placeholder scripts gated: {gate_enabled}"));

        Self {
            policy: config.expiry_policy(),
            config,
            store,
            gate,
            data_layer: page.data_layer,
            scripts: page.scripts,
            surface: page.surface,
            clock: page.clock,
            diagnostics,
            state: PermissionState::policy_default(),
            phase: EnginePhase::Uninitialized,
            seeded_from_storage: false,
            startup_decision: None,
            ui_bound: false,
        }
    }

    /// Build the engine from host attributes and run the startup sequence,
    /// including the tag bootstrap.
    ///
    /// An unidentifiable host aborts before anything is declared.
    pub fn bootstrap(
        host: Option<&dyn HostAttributes>,
        page: ConsentPage<D, H, U>,
        loader: &mut dyn TagLoader,
    ) -> Result<Self> {
        let config = ConsentConfig::from_host(host).map_err(|error| {
            tracing::error!("CRITICAL: {error}. Consent management disabled for this page.");
            error
        })?;
        let mut engine = Self::new(config, page);
        engine.start(loader)?;
        Ok(engine)
    }

    pub fn config(&self) -> &ConsentConfig {
        &self.config
    }

    pub fn mapping(&self) -> &CategoryMapping {
        &self.config.category_mapping
    }

    pub fn state(&self) -> &PermissionState {
        &self.state
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn seeded_from_storage(&self) -> bool {
        self.seeded_from_storage
    }

    pub fn store(&self) -> &ConsentStore {
        &self.store
    }

    pub fn data_layer(&self) -> &D {
        &self.data_layer
    }

    pub fn scripts(&self) -> &H {
        &self.scripts
    }

    pub fn scripts_mut(&mut self) -> &mut H {
        &mut self.scripts
    }

    pub fn surface(&self) -> &U {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut U {
        &mut self.surface
    }

    /// Reconcile consent, then request the tag bootstrap.
    pub fn start(&mut self, loader: &mut dyn TagLoader) -> Result<()> {
        self.init()?;
        self.load_tags(loader)?;
        self.diagnostics.info("consent setup complete");
        Ok(())
    }

    /// The posture to declare before anything else.
    ///
    /// When seeding is enabled and a valid decision is stored, that decision
    /// becomes the default and the engine is marked seeded-from-storage.
    pub fn compute_default(&mut self) -> PermissionState {
        if self.config.strategy.seed_default_from_storage {
            if let Some(stored) = self.startup_decision() {
                self.seeded_from_storage = true;
                self.state = stored.clone();
                return stored;
            }
        }
        let default = PermissionState::policy_default();
        self.state = default.clone();
        default
    }

    /// Send the default directive. Listeners get no grace period when the
    /// default already reflects a stored decision.
    pub fn declare_default(&mut self, state: PermissionState) -> Result<()> {
        let wait_for_update_ms = if self.seeded_from_storage {
            0
        } else {
            self.config.wait_for_update_ms
        };
        let command = ConsentCommand::Default {
            state,
            wait_for_update_ms,
        };
        self.diagnostics.info_with(
            &format!("setting default consent (wait_for_update {wait_for_update_ms} ms)"),
            command.state(),
        );
        self.data_layer.push(DataLayerMessage::Consent(command))?;
        self.phase = EnginePhase::DefaultDeclared;
        Ok(())
    }

    /// Declare the default and reconcile it with any stored decision.
    pub fn init(&mut self) -> Result<()> {
        if self.phase != EnginePhase::Uninitialized {
            return Err(ConsentError::InvalidInput("consent engine already initialized".to_string()));
        }

        let default = self.compute_default();
        self.declare_default(default)?;

        self.ui_bound = self.surface.has_banner();
        if !self.ui_bound {
            self.diagnostics
                .warn("consent banner not found; consent UI will not be displayed");
        }

        if self.seeded_from_storage {
            self.diagnostics
                .info("default consent was seeded from storage; hiding banner and activating scripts");
            self.surface.set_banner_visible(false);
            if self.config.strategy.broadcast_on_seeded_default {
                self.data_layer.push(DataLayerMessage::ConsentStateUpdated {
                    state: self.state.clone(),
                })?;
            }
            self.restore_scripts();
            self.phase = EnginePhase::Reconciled;
            return Ok(());
        }

        match self.startup_decision() {
            Some(stored) => {
                self.diagnostics.info("stored consent found; applying consent state");
                self.data_layer
                    .push(DataLayerMessage::Consent(ConsentCommand::Update { state: stored.clone() }))?;
                self.state = stored;
                self.surface.set_banner_visible(false);
                self.restore_scripts();
                self.phase = EnginePhase::Reconciled;
            }
            None => {
                self.diagnostics
                    .info("no valid stored consent; banner will be shown");
                self.surface.set_banner_visible(true);
                self.phase = EnginePhase::AwaitingUserInput;
            }
        }
        Ok(())
    }

    /// Load the stored record and apply the expiry policy to it.
    ///
    /// Expired records are removed; re-prompt records stay until the next
    /// decision overwrites them.
    pub fn read_stored_decision(&mut self) -> Option<PermissionState> {
        let record = self.store.load()?;
        let now = self.clock.now_ms();
        match self.policy.evaluate(&record, now) {
            ExpiryVerdict::Valid(state) => {
                self.diagnostics.info_with(
                    &format!(
                        "stored consent loaded and valid (elapsed {} ms, all optional denied: {})",
                        now - record.timestamp,
                        record.all_optional_denied
                    ),
                    &state,
                );
                Some(state)
            }
            ExpiryVerdict::Expired => {
                let limit = match self.policy.max_age.as_ms() {
                    Some(ms) => format!("{} days", ms / crate::clock::MS_IN_DAY as f64),
                    None => "forever".to_string(),
                };
                self.diagnostics.warn_with(
                    &format!("stored consent expired (older than {limit}); treating as no consent"),
                    &record,
                );
                self.store.purge();
                None
            }
            ExpiryVerdict::EligibleForReprompt => {
                self.diagnostics.warn(&format!(
                    "all-denied consent older than {} days; showing banner again",
                    self.policy.rejection_refresh_days
                ));
                None
            }
        }
    }

    /// Apply a decision made through the UI.
    ///
    /// Absent flags in `decision` are denied and the pinned flag is granted.
    /// Storage failures are logged; the decision still applies for this page.
    pub fn apply_user_decision(&mut self, decision: &PermissionState) -> Result<()> {
        if self.phase == EnginePhase::Uninitialized {
            return Err(ConsentError::InvalidInput(
                "default consent must be declared before an update".to_string(),
            ));
        }

        let state = PermissionState::from_values(decision.iter()).with_pinned();
        self.diagnostics
            .info_with("updating consent after UI interaction", &state);
        self.data_layer
            .push(DataLayerMessage::Consent(ConsentCommand::Update { state: state.clone() }))?;
        self.state = state.clone();

        let now = self.clock.now_ms();
        if let Err(error) = self.store.save(&state, now) {
            self.diagnostics
                .error(&format!("error saving consent: {error}"));
        }

        self.data_layer
            .push(DataLayerMessage::ConsentStateUpdated { state })?;
        let activated = self.gate.activate_state(&mut self.scripts, &self.state);
        if self.gate.is_enabled() {
            self.diagnostics
                .info(&format!("{activated} placeholder scripts activated after decision"));
        }

        self.surface.set_banner_visible(false);
        self.surface.set_modal_visible(SETTINGS_MODAL, false);
        self.phase = EnginePhase::Reconciled;
        Ok(())
    }

    /// Dispatch a UI action. Without a banner on the page no actions are bound.
    pub fn handle_action(&mut self, action: UiAction) -> Result<()> {
        if !self.ui_bound {
            self.diagnostics
                .warn(&format!("ignoring {action:?}: consent UI is not bound"));
            return Ok(());
        }

        match action {
            UiAction::AcceptAll => self.apply_user_decision(&PermissionState::all_granted()),
            UiAction::RejectAll => self.apply_user_decision(&PermissionState::denied()),
            UiAction::OpenSettings => {
                self.open_settings();
                Ok(())
            }
            UiAction::SaveSettings => {
                let choices = self.surface.category_choices();
                let decision = self
                    .config
                    .category_mapping
                    .state_from_choices(choices.iter().map(|(category, checked)| (category.as_str(), *checked)));
                self.apply_user_decision(&decision)
            }
            UiAction::CloseModal { target } => {
                match target {
                    Some(name) => self.surface.set_modal_visible(&name, false),
                    None => self.diagnostics.warn("close-modal action without a target modal"),
                }
                Ok(())
            }
        }
    }

    /// Reflect the current decision on the checkboxes and show the settings
    /// modal. Before any decision every box is shown unchecked.
    pub fn open_settings(&mut self) {
        let view = if self.phase == EnginePhase::Reconciled {
            self.state.clone()
        } else {
            PermissionState::denied()
        };
        reflect_state(&mut self.surface, &self.config.category_mapping, &view);
        if !self.surface.has_modal(SETTINGS_MODAL) {
            self.diagnostics.warn("settings modal not found");
        }
        self.surface.set_modal_visible(SETTINGS_MODAL, true);
    }

    /// Request the configured tag bootstrap without waiting for it.
    pub fn load_tags(&mut self, loader: &mut dyn TagLoader) -> Result<()> {
        let Some(request) = TagScriptRequest::for_config(&self.config) else {
            return Ok(());
        };
        if request.kind == TagKind::TagManager {
            self.data_layer.push(DataLayerMessage::TagManagerStart {
                start_ms: self.clock.now_ms(),
            })?;
            self.diagnostics.info("pushed tag manager start event");
        }
        self.diagnostics
            .info(&format!("requesting tag script {}", request.src));
        loader.load(request);
        Ok(())
    }

    /// Completion callback for a bootstrap script.
    pub fn on_tag_loaded(&mut self, kind: TagKind) -> Result<()> {
        match kind {
            TagKind::TagManager => {
                self.diagnostics.info("tag manager script loaded");
            }
            TagKind::Analytics => {
                let Some(measurement_id) = self.config.analytics_id.clone() else {
                    return Ok(());
                };
                self.diagnostics.info("analytics script loaded; configuring");
                self.data_layer.push(DataLayerMessage::AnalyticsLoaded)?;
                self.data_layer.push(DataLayerMessage::AnalyticsJs {
                    at_ms: self.clock.now_ms(),
                })?;
                self.data_layer
                    .push(DataLayerMessage::AnalyticsConfig { measurement_id })?;
            }
        }
        Ok(())
    }

    pub fn on_tag_load_failed(&mut self, kind: TagKind) {
        self.diagnostics
            .error(&format!("error loading {kind:?} script"));
    }

    /// Activate the placeholders controlled by `flag`, whatever the current
    /// decision says. Already activated scripts are skipped.
    pub fn activate_scripts(&mut self, flag: PermissionFlag) -> usize {
        self.gate.activate(&mut self.scripts, flag)
    }

    /// Storage is read once per page; later calls reuse the first verdict.
    fn startup_decision(&mut self) -> Option<PermissionState> {
        if self.startup_decision.is_none() {
            let decision = self.read_stored_decision();
            self.startup_decision = Some(decision);
        }
        self.startup_decision.clone().flatten()
    }

    fn restore_scripts(&mut self) -> usize {
        self.gate.activate_consented(&mut self.scripts, &self.state)
    }
}
