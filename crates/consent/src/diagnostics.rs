//! Developer-mode aware logging.
//!
//! Informational messages are only emitted in developer mode; warnings and
//! errors always go out. Payloads are rendered as JSON, falling back to
//! their `Debug` form when they cannot be serialized.

use std::fmt::Debug;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    dev_mode: bool,
}

impl Diagnostics {
    pub fn new(dev_mode: bool) -> Self {
        Self { dev_mode }
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn info(&self, message: &str) {
        if self.dev_mode {
            tracing::info!("{message}");
        }
    }

    pub fn info_with<T>(&self, message: &str, data: &T)
    where
        T: Serialize + Debug + ?Sized,
    {
        if self.dev_mode {
            tracing::info!(data = %render(data), "{message}");
        }
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    pub fn warn_with<T>(&self, message: &str, data: &T)
    where
        T: Serialize + Debug + ?Sized,
    {
        tracing::warn!(data = %render(data), "{message}");
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Render a log payload as JSON, or as `Debug` output when serialization fails.
pub fn render<T>(data: &T) -> String
where
    T: Serialize + Debug + ?Sized,
{
    serde_json::to_string(data).unwrap_or_else(|_| format!("{data:?}"))
}
