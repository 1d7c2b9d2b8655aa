//! Placeholder and activated script declarations.

pub const PLACEHOLDER_TYPE: &str = "text/plain";
pub const EXECUTABLE_TYPE: &str = "text/javascript";
pub const TYPE_ATTRIBUTE: &str = "type";
pub const SRC_ATTRIBUTE: &str = "src";
pub const CATEGORY_ATTRIBUTE: &str = "data-cb-consent-category";
pub const ACTIVATED_ATTRIBUTE: &str = "data-cb-activated";

/// Host-assigned handle for a script element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    External(String),
    Inline(String),
}

/// An inert script declaration waiting for its category to be granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderScript {
    pub id: ScriptId,
    pub attributes: Vec<(String, String)>,
    pub body: String,
    /// Set once the script has been promoted; never cleared.
    pub activated: bool,
}

impl PlaceholderScript {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn category(&self) -> Option<&str> {
        self.attribute(CATEGORY_ATTRIBUTE)
    }

    pub fn is_inert(&self) -> bool {
        self.attribute(TYPE_ATTRIBUTE) == Some(PLACEHOLDER_TYPE)
    }

    pub fn source(&self) -> ScriptSource {
        match self.attribute(SRC_ATTRIBUTE) {
            Some(src) if !src.is_empty() => ScriptSource::External(src.to_string()),
            _ => ScriptSource::Inline(self.body.clone()),
        }
    }
}

/// The executing twin created from a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivatedScript {
    pub attributes: Vec<(String, String)>,
    pub source: ScriptSource,
}

impl ActivatedScript {
    /// Copy every attribute except the placeholder-only ones, mark the
    /// script executable and keep the external/inline distinction.
    pub fn from_placeholder(placeholder: &PlaceholderScript) -> Self {
        let mut attributes: Vec<(String, String)> = placeholder
            .attributes
            .iter()
            .filter(|(name, _)| !is_placeholder_only(name))
            .cloned()
            .collect();
        attributes.push((TYPE_ATTRIBUTE.to_string(), EXECUTABLE_TYPE.to_string()));
        Self {
            attributes,
            source: placeholder.source(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn is_placeholder_only(name: &str) -> bool {
    name == TYPE_ATTRIBUTE || name == CATEGORY_ATTRIBUTE || name == ACTIVATED_ATTRIBUTE
}
