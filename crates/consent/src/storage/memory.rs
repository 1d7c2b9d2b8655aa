//! In-memory slot implementation.

use std::collections::HashMap;

use super::ConsentSlot;
use crate::error::Result;
#[cfg(test)]
use crate::error::ConsentError;

#[derive(Debug, Default, Clone)]
pub struct MemorySlot {
    data: HashMap<String, String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot with one raw value.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut slot = Self::default();
        slot.data.insert(key.to_string(), value.to_string());
        slot
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }
}

impl ConsentSlot for MemorySlot {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }
}

/// Slot whose every operation fails, as a browser with storage disabled does.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingSlot;

#[cfg(test)]
impl ConsentSlot for FailingSlot {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(ConsentError::StorageUnavailable("storage disabled".to_string()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
        Err(ConsentError::StorageUnavailable("storage disabled".to_string()))
    }

    fn remove(&mut self, _key: &str) -> Result<()> {
        Err(ConsentError::StorageUnavailable("storage disabled".to_string()))
    }
}
