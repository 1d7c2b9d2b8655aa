//! Script gate: promotes inert placeholder scripts once their category's
//! flag is granted.

pub mod document;
pub mod script;

pub use document::{ScriptDocument, ScriptNode};
pub use script::{ActivatedScript, PlaceholderScript, ScriptId, ScriptSource};

use crate::category::CategoryMapping;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::permission::{PermissionFlag, PermissionState};

/// Document capability used by the gate.
///
/// The gate decides which placeholders to promote; the host owns element
/// creation and insertion.
pub trait ScriptHost {
    /// Inert placeholders tagged with `category`, in document order.
    fn find_placeholders(&self, category: &str) -> Vec<PlaceholderScript>;

    /// Insert `script` right after the placeholder and mark the placeholder
    /// activated.
    fn promote(&mut self, placeholder: ScriptId, script: ActivatedScript) -> Result<()>;
}

pub struct ScriptGate {
    mapping: CategoryMapping,
    enabled: bool,
    diagnostics: Diagnostics,
}

impl ScriptGate {
    pub fn new(mapping: CategoryMapping, enabled: bool, diagnostics: Diagnostics) -> Self {
        Self {
            mapping,
            enabled,
            diagnostics,
        }
    }

    /// Whether this page delegates script consent to the gate at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Promote every not-yet-activated placeholder whose category controls
    /// `flag`. Returns how many scripts were activated.
    pub fn activate<H>(&self, host: &mut H, flag: PermissionFlag) -> usize
    where
        H: ScriptHost + ?Sized,
    {
        if !self.enabled {
            return 0;
        }

        let mut activated = 0;
        for category in self.mapping.categories_controlling(flag) {
            for placeholder in host.find_placeholders(category) {
                if placeholder.activated {
                    continue;
                }
                let script = ActivatedScript::from_placeholder(&placeholder);
                let label = match &script.source {
                    ScriptSource::External(src) => src.clone(),
                    ScriptSource::Inline(_) => "inline".to_string(),
                };
                match host.promote(placeholder.id, script) {
                    Ok(()) => {
                        activated += 1;
                        self.diagnostics
                            .info(&format!("activated script (category: {category}): {label}"));
                    }
                    Err(error) => self.diagnostics.warn(&format!(
                        "failed to activate script (category: {category}): {error}"
                    )),
                }
            }
        }
        activated
    }

    /// Run an activation pass for every granted flag in `state`, the pinned
    /// flag included. Used after a user decision.
    pub fn activate_state<H>(&self, host: &mut H, state: &PermissionState) -> usize
    where
        H: ScriptHost + ?Sized,
    {
        self.activate_all(host, state.granted_flags())
    }

    /// Run an activation pass for the flags a stored decision granted on top
    /// of the policy default. The pinned flag is granted by the default
    /// itself, so restoring a decision never opens its categories.
    pub fn activate_consented<H>(&self, host: &mut H, state: &PermissionState) -> usize
    where
        H: ScriptHost + ?Sized,
    {
        self.activate_all(host, state.consented_flags())
    }

    fn activate_all<H, I>(&self, host: &mut H, flags: I) -> usize
    where
        H: ScriptHost + ?Sized,
        I: IntoIterator<Item = PermissionFlag>,
    {
        if !self.enabled {
            return 0;
        }
        flags.into_iter().map(|flag| self.activate(host, flag)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{ANALYTICS, MARKETING, PREFERENCES};
    use crate::permission::ConsentValue;

    fn gate(enabled: bool) -> ScriptGate {
        ScriptGate::new(CategoryMapping::default(), enabled, Diagnostics::default())
    }

    #[test]
    fn activates_matching_placeholders_once() {
        let mut doc = ScriptDocument::new();
        let a1 = doc.add_inline(ANALYTICS, "a1();");
        let a2 = doc.add_external(ANALYTICS, "https://cdn.example.com/a2.js");
        let m = doc.add_inline(MARKETING, "m();");

        let gate = gate(true);
        assert_eq!(gate.activate(&mut doc, PermissionFlag::AnalyticsStorage), 2);
        assert_eq!(gate.activate(&mut doc, PermissionFlag::AnalyticsStorage), 0);

        assert!(doc.is_activated(a1));
        assert!(doc.is_activated(a2));
        assert!(!doc.is_activated(m));
        assert_eq!(doc.live_scripts().len(), 2);
    }

    #[test]
    fn each_marketing_flag_opens_the_marketing_category() {
        let mut doc = ScriptDocument::new();
        doc.add_inline(MARKETING, "m();");
        let gate = gate(true);
        assert_eq!(gate.activate(&mut doc, PermissionFlag::AdUserData), 1);
        assert_eq!(gate.activate(&mut doc, PermissionFlag::AdStorage), 0);
    }

    #[test]
    fn disabled_gate_is_a_no_op() {
        let mut doc = ScriptDocument::new();
        doc.add_inline(ANALYTICS, "a();");
        let gate = gate(false);
        assert_eq!(gate.activate(&mut doc, PermissionFlag::AnalyticsStorage), 0);
        assert!(!gate.is_enabled());
        assert_eq!(gate.activate_state(&mut doc, &PermissionState::all_granted()), 0);
        assert_eq!(gate.activate_consented(&mut doc, &PermissionState::all_granted()), 0);
        assert!(doc.live_scripts().is_empty());
    }

    #[test]
    fn flag_without_category_activates_nothing() {
        let mapping = CategoryMapping::new(vec![crate::category::CategoryEntry {
            name: ANALYTICS.to_string(),
            flags: vec![PermissionFlag::AnalyticsStorage],
        }])
        .unwrap();
        let gate = ScriptGate::new(mapping, true, Diagnostics::default());
        let mut doc = ScriptDocument::new();
        doc.add_inline(MARKETING, "m();");
        assert_eq!(gate.activate(&mut doc, PermissionFlag::AdStorage), 0);
    }

    #[test]
    fn decision_pass_includes_pinned_flag() {
        let mut doc = ScriptDocument::new();
        let pref = doc.add_inline(PREFERENCES, "p();");
        let analytics = doc.add_inline(ANALYTICS, "a();");
        let marketing = doc.add_inline(MARKETING, "m();");

        let state = PermissionState::from_values([(PermissionFlag::AnalyticsStorage, ConsentValue::Granted)])
            .with_pinned();
        assert_eq!(gate(true).activate_state(&mut doc, &state), 2);
        assert!(doc.is_activated(analytics));
        assert!(doc.is_activated(pref));
        assert!(!doc.is_activated(marketing));
    }

    #[test]
    fn restored_pass_skips_pinned_flag() {
        let mut doc = ScriptDocument::new();
        let pref = doc.add_inline(PREFERENCES, "p();");
        let analytics = doc.add_inline(ANALYTICS, "a();");

        let state = PermissionState::from_values([(PermissionFlag::AnalyticsStorage, ConsentValue::Granted)])
            .with_pinned();
        assert_eq!(gate(true).activate_consented(&mut doc, &state), 1);
        assert!(doc.is_activated(analytics));
        assert!(!doc.is_activated(pref));
    }
}
