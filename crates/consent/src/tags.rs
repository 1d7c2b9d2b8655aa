//! Tag-manager and direct-analytics bootstrap.
//!
//! The script itself is an opaque external resource; the engine only asks
//! the host to start loading it and never waits for completion.

use crate::config::ConsentConfig;

pub const TAG_MANAGER_SCRIPT_URL: &str = "https://www.googletagmanager.com/gtm.js";
pub const ANALYTICS_SCRIPT_URL: &str = "https://www.googletagmanager.com/gtag/js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    TagManager,
    Analytics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScriptRequest {
    pub kind: TagKind,
    pub id: String,
    pub src: String,
}

impl TagScriptRequest {
    /// The bootstrap a configuration asks for. A tag-manager container takes
    /// precedence over a direct analytics id.
    pub fn for_config(config: &ConsentConfig) -> Option<Self> {
        if let Some(id) = &config.tag_manager_id {
            return Some(Self {
                kind: TagKind::TagManager,
                id: id.clone(),
                src: format!("{TAG_MANAGER_SCRIPT_URL}?id={id}"),
            });
        }
        config.analytics_id.as_ref().map(|id| Self {
            kind: TagKind::Analytics,
            id: id.clone(),
            src: format!("{ANALYTICS_SCRIPT_URL}?id={id}"),
        })
    }
}

/// Fire-and-forget script loading.
///
/// Implementations start an asynchronous load and return immediately. The
/// host reports the outcome later through
/// [`ConsentEngine::on_tag_loaded`](crate::engine::ConsentEngine::on_tag_loaded)
/// or [`ConsentEngine::on_tag_load_failed`](crate::engine::ConsentEngine::on_tag_load_failed).
pub trait TagLoader {
    fn load(&mut self, request: TagScriptRequest);
}

#[derive(Debug, Default, Clone)]
pub struct RecordingTagLoader {
    requests: Vec<TagScriptRequest>,
}

impl RecordingTagLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[TagScriptRequest] {
        &self.requests
    }
}

impl TagLoader for RecordingTagLoader {
    fn load(&mut self, request: TagScriptRequest) {
        self.requests.push(request);
    }
}
