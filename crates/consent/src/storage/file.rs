use std::io::ErrorKind;
use std::path::PathBuf;

use super::ConsentSlot;
use crate::error::{ConsentError, Result};

/// Slot that keeps one JSON document per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileSlot {
    root: PathBuf,
}

impl FileSlot {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn build_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        let mut filename = key.to_string();
        if !filename.ends_with(".json") {
            filename.push_str(".json");
        }
        Ok(self.root.join(filename))
    }
}

impl ConsentSlot for FileSlot {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.build_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ConsentError::StorageUnavailable(format!(
                "failed to read consent slot {}: {error}",
                path.display()
            ))),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.build_path(key)?;
        std::fs::create_dir_all(&self.root).map_err(|error| {
            ConsentError::StorageUnavailable(format!(
                "failed to create consent directory {}: {error}",
                self.root.display()
            ))
        })?;
        std::fs::write(&path, value).map_err(|error| {
            ConsentError::StorageUnavailable(format!(
                "failed to write consent slot {}: {error}",
                path.display()
            ))
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.build_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ConsentError::StorageUnavailable(format!(
                "failed to remove consent slot {}: {error}",
                path.display()
            ))),
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(ConsentError::InvalidInput(format!("invalid slot key {key}")));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(ConsentError::InvalidInput(format!("invalid slot key {key}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_reads_value() {
        let dir = tempdir().expect("tempdir");
        let mut slot = FileSlot::new(dir.path().to_path_buf());
        slot.set("consent.v1", r#"{"ok":true}"#).expect("set");
        let loaded = slot.get("consent.v1").expect("get").expect("value");
        assert_eq!(loaded, r#"{"ok":true}"#);
    }

    #[test]
    fn missing_file_returns_none() {
        let dir = tempdir().expect("tempdir");
        let slot = FileSlot::new(dir.path().to_path_buf());
        assert!(slot.get("missing").expect("get").is_none());
    }

    #[test]
    fn remove_deletes_and_tolerates_missing() {
        let dir = tempdir().expect("tempdir");
        let mut slot = FileSlot::new(dir.path().join("nested"));
        slot.set("key", "value").expect("set");
        slot.remove("key").expect("remove");
        assert!(slot.get("key").expect("get").is_none());
        slot.remove("key").expect("second remove");
    }

    #[test]
    fn invalid_key_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut slot = FileSlot::new(dir.path().to_path_buf());
        let err = slot.set("../escape", "x").expect_err("invalid key");
        match err {
            ConsentError::InvalidInput(_) => {}
            other => panic!("expected invalid input, got {other:?}"),
        }
    }
}
