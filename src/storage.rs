//! This module saves the user events to local files

use std::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::traits::KeyValueStore;

/// A [`KeyValueStore`] that keeps each key in its own file inside a folder.
///
/// Keys are sanitized before being used as file names, so any storage key the dashboard picks is acceptable.
#[derive(Debug, PartialEq)]
pub struct FileStore {
    folder: PathBuf,
}

impl FileStore {
    /// Store keys under the given folder. The folder is created on the first write
    pub fn new(folder: &Path) -> Self {
        Self {
            folder: PathBuf::from(folder),
        }
    }

    fn file_for_key(&self, key: &str) -> PathBuf {
        self.folder.join(sanitize_filename::sanitize(key) + ".json")
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        match std::fs::read_to_string(self.file_for_key(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    Ok(None)
                } else {
                    Err(err.into())
                }
            },
        }
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        std::fs::create_dir_all(&self.folder)?;
        std::fs::write(self.file_for_key(key), value)?;
        Ok(())
    }
}
