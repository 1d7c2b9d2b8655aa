//! UI binding: user actions and the surface they are reflected on.

pub mod surface;

pub use surface::MemorySurface;

use crate::category::CategoryMapping;
use crate::error::{ConsentError, Result};
use crate::permission::PermissionState;

pub const SETTINGS_MODAL: &str = "settings";

/// A click on one of the action-tagged elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    AcceptAll,
    RejectAll,
    OpenSettings,
    SaveSettings,
    /// Close the named modal; `None` when the element names no target.
    CloseModal { target: Option<String> },
}

impl UiAction {
    /// Parse an action name as found on the triggering element.
    pub fn parse(action: &str, target_modal: Option<&str>) -> Result<Self> {
        match action {
            "accept-all" => Ok(UiAction::AcceptAll),
            "reject-all" => Ok(UiAction::RejectAll),
            "open-settings" | "reopen-settings" => Ok(UiAction::OpenSettings),
            "save-settings" => Ok(UiAction::SaveSettings),
            "close-modal" => Ok(UiAction::CloseModal {
                target: target_modal.filter(|name| !name.is_empty()).map(str::to_string),
            }),
            other => Err(ConsentError::InvalidInput(format!("unknown consent action {other}"))),
        }
    }
}

/// Banner, modals and category checkboxes of the consent UI.
///
/// Any of the elements may be missing from the page; setters on a missing
/// element do nothing.
pub trait ConsentSurface {
    fn has_banner(&self) -> bool;
    fn has_modal(&self, name: &str) -> bool;
    fn set_banner_visible(&mut self, visible: bool);
    fn set_modal_visible(&mut self, name: &str, visible: bool);
    fn set_category_checked(&mut self, category: &str, checked: bool);
    /// Every category checkbox with its checked state, in page order.
    fn category_choices(&self) -> Vec<(String, bool)>;
}

/// Check each known category's box iff the category is fully granted.
pub fn reflect_state<S>(surface: &mut S, mapping: &CategoryMapping, state: &PermissionState)
where
    S: ConsentSurface + ?Sized,
{
    for (category, _) in surface.category_choices() {
        if mapping.contains(&category) {
            let checked = mapping.is_category_granted(&category, state);
            surface.set_category_checked(&category, checked);
        }
    }
}
