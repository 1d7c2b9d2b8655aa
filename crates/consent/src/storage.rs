//! String-keyed persistence slots backing the consent store.

pub mod file;
pub mod memory;

pub use file::FileSlot;
pub use memory::MemorySlot;

use crate::error::Result;

/// A single string-keyed, string-valued get/set/remove store.
///
/// Browser hosts back this with local storage; every method may fail when
/// the underlying storage is unavailable.
pub trait ConsentSlot {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}
