use std::collections::BTreeMap;

use super::ConsentSurface;

/// In-memory consent UI.
///
/// Elements exist only when added through the builder methods; a surface
/// built with [`MemorySurface::new`] alone behaves like a page without any
/// consent UI.
#[derive(Debug, Default, Clone)]
pub struct MemorySurface {
    banner: Option<bool>,
    modals: BTreeMap<String, bool>,
    checkboxes: Vec<(String, bool)>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Banner, settings modal and one checkbox per category.
    pub fn standard<'a>(categories: impl IntoIterator<Item = &'a str>) -> Self {
        categories
            .into_iter()
            .fold(Self::new().with_banner().with_modal(super::SETTINGS_MODAL), |surface, category| {
                surface.with_checkbox(category)
            })
    }

    pub fn with_banner(mut self) -> Self {
        self.banner = Some(false);
        self
    }

    pub fn with_modal(mut self, name: &str) -> Self {
        self.modals.insert(name.to_string(), false);
        self
    }

    pub fn with_checkbox(mut self, category: &str) -> Self {
        self.checkboxes.push((category.to_string(), false));
        self
    }

    pub fn banner_visible(&self) -> bool {
        self.banner.unwrap_or(false)
    }

    pub fn modal_visible(&self, name: &str) -> bool {
        self.modals.get(name).copied().unwrap_or(false)
    }

    pub fn is_checked(&self, category: &str) -> bool {
        self.checkboxes
            .iter()
            .any(|(name, checked)| name == category && *checked)
    }

    /// Toggle a checkbox the way a user click would.
    pub fn check(&mut self, category: &str, checked: bool) {
        self.set_category_checked(category, checked);
    }
}

impl ConsentSurface for MemorySurface {
    fn has_banner(&self) -> bool {
        self.banner.is_some()
    }

    fn has_modal(&self, name: &str) -> bool {
        self.modals.contains_key(name)
    }

    fn set_banner_visible(&mut self, visible: bool) {
        if let Some(banner) = self.banner.as_mut() {
            *banner = visible;
        }
    }

    fn set_modal_visible(&mut self, name: &str, visible: bool) {
        if let Some(modal) = self.modals.get_mut(name) {
            *modal = visible;
        }
    }

    fn set_category_checked(&mut self, category: &str, checked: bool) {
        for (name, state) in self.checkboxes.iter_mut() {
            if name == category {
                *state = checked;
            }
        }
    }

    fn category_choices(&self) -> Vec<(String, bool)> {
        self.checkboxes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_elements_ignore_updates() {
        let mut surface = MemorySurface::new();
        surface.set_banner_visible(true);
        surface.set_modal_visible("settings", true);
        assert!(!surface.has_banner());
        assert!(!surface.banner_visible());
        assert!(!surface.modal_visible("settings"));
    }

    #[test]
    fn standard_surface_has_every_element() {
        let mut surface = MemorySurface::standard(["analytics", "marketing"]);
        assert!(surface.has_banner());
        assert!(surface.has_modal("settings"));
        assert_eq!(surface.category_choices().len(), 2);

        surface.set_banner_visible(true);
        assert!(surface.banner_visible());
    }
}
