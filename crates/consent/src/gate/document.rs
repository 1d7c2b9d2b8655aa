//! In-memory script document.
//!
//! Keeps script nodes in document order so that promotion can insert the
//! live twin right after its placeholder.

use super::script::{
    ActivatedScript, PlaceholderScript, ScriptId, ACTIVATED_ATTRIBUTE, CATEGORY_ATTRIBUTE,
    PLACEHOLDER_TYPE, SRC_ATTRIBUTE, TYPE_ATTRIBUTE,
};
use super::ScriptHost;
use crate::error::{ConsentError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptNode {
    Placeholder(PlaceholderScript),
    Live(ActivatedScript),
}

#[derive(Debug, Default, Clone)]
pub struct ScriptDocument {
    nodes: Vec<ScriptNode>,
    next_id: usize,
}

impl ScriptDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a placeholder with arbitrary attributes.
    pub fn add_placeholder(&mut self, attributes: &[(&str, &str)], body: &str) -> ScriptId {
        let id = ScriptId(self.next_id);
        self.next_id += 1;
        self.nodes.push(ScriptNode::Placeholder(PlaceholderScript {
            id,
            attributes: attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            body: body.to_string(),
            activated: false,
        }));
        id
    }

    /// Append an inline placeholder gated by `category`.
    pub fn add_inline(&mut self, category: &str, body: &str) -> ScriptId {
        self.add_placeholder(
            &[(TYPE_ATTRIBUTE, PLACEHOLDER_TYPE), (CATEGORY_ATTRIBUTE, category)],
            body,
        )
    }

    /// Append an external placeholder gated by `category`.
    pub fn add_external(&mut self, category: &str, src: &str) -> ScriptId {
        self.add_placeholder(
            &[
                (TYPE_ATTRIBUTE, PLACEHOLDER_TYPE),
                (CATEGORY_ATTRIBUTE, category),
                (SRC_ATTRIBUTE, src),
            ],
            "",
        )
    }

    pub fn nodes(&self) -> &[ScriptNode] {
        &self.nodes
    }

    pub fn live_scripts(&self) -> Vec<&ActivatedScript> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                ScriptNode::Live(script) => Some(script),
                ScriptNode::Placeholder(_) => None,
            })
            .collect()
    }

    pub fn placeholder(&self, id: ScriptId) -> Option<&PlaceholderScript> {
        self.nodes.iter().find_map(|node| match node {
            ScriptNode::Placeholder(placeholder) if placeholder.id == id => Some(placeholder),
            _ => None,
        })
    }

    pub fn is_activated(&self, id: ScriptId) -> bool {
        self.placeholder(id).is_some_and(|placeholder| placeholder.activated)
    }
}

impl ScriptHost for ScriptDocument {
    fn find_placeholders(&self, category: &str) -> Vec<PlaceholderScript> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                ScriptNode::Placeholder(placeholder)
                    if placeholder.is_inert() && placeholder.category() == Some(category) =>
                {
                    Some(placeholder.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn promote(&mut self, placeholder: ScriptId, script: ActivatedScript) -> Result<()> {
        let index = self
            .nodes
            .iter()
            .position(|node| matches!(node, ScriptNode::Placeholder(p) if p.id == placeholder))
            .ok_or_else(|| {
                ConsentError::InvalidInput(format!("unknown placeholder {}", placeholder.0))
            })?;

        if let ScriptNode::Placeholder(node) = &mut self.nodes[index] {
            node.activated = true;
            node.attributes
                .push((ACTIVATED_ATTRIBUTE.to_string(), "true".to_string()));
        }
        self.nodes.insert(index + 1, ScriptNode::Live(script));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_inserts_twin_after_placeholder() {
        let mut doc = ScriptDocument::new();
        let first = doc.add_inline("analytics", "a();");
        let second = doc.add_inline("marketing", "m();");

        let placeholder = doc.placeholder(first).cloned().expect("placeholder");
        doc.promote(first, ActivatedScript::from_placeholder(&placeholder))
            .expect("promote");

        assert!(doc.is_activated(first));
        assert!(!doc.is_activated(second));
        assert!(matches!(doc.nodes()[1], ScriptNode::Live(_)));
        assert_eq!(
            doc.placeholder(first).and_then(|p| p.attribute(ACTIVATED_ATTRIBUTE)),
            Some("true")
        );
    }

    #[test]
    fn find_placeholders_matches_category_only() {
        let mut doc = ScriptDocument::new();
        doc.add_inline("analytics", "a();");
        doc.add_external("marketing", "https://ads.example.com/p.js");
        doc.add_placeholder(&[(TYPE_ATTRIBUTE, "module"), (CATEGORY_ATTRIBUTE, "analytics")], "");

        assert_eq!(doc.find_placeholders("analytics").len(), 1);
        assert_eq!(doc.find_placeholders("marketing").len(), 1);
        assert!(doc.find_placeholders("preferences").is_empty());
    }

    #[test]
    fn promoting_unknown_placeholder_fails() {
        let mut doc = ScriptDocument::new();
        let script = ActivatedScript {
            attributes: Vec::new(),
            source: super::super::script::ScriptSource::Inline(String::new()),
        };
        assert!(doc.promote(ScriptId(7), script).is_err());
    }
}
