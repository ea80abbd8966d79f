use std::path::{Path, PathBuf};

use crate::{NoteError, Result};

/// Directory under the home directory holding the archive
pub const DEFAULT_DIR_NAME: &str = "scrolls-of-skelos";
/// Collection document inside the data directory
pub const COLLECTION_FILE_NAME: &str = "scrolls.json";
/// Subdirectory for captured images
pub const IMAGES_DIR_NAME: &str = "screenshots";

/// Application configuration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root directory of the archive
    pub data_dir: PathBuf,

    /// Directory where captured images are written
    pub images_dir: PathBuf,

    /// The single JSON document holding every note
    pub collection_file: PathBuf,

    /// Capture command overriding tool detection, `{path}` marks the target
    pub capture_command: Option<String>,
}

impl Config {
    /// Layout rooted at `$HOME/scrolls-of-skelos`
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| NoteError::DirectoryError {
            path: PathBuf::from("~"),
        })?;
        Ok(Self::from_data_dir(home.join(DEFAULT_DIR_NAME)))
    }

    /// Standard layout under an arbitrary root
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            images_dir: data_dir.join(IMAGES_DIR_NAME),
            collection_file: data_dir.join(COLLECTION_FILE_NAME),
            data_dir,
            capture_command: None,
        }
    }

    pub fn with_capture_command(mut self, command: Option<String>) -> Self {
        self.capture_command = command.filter(|c| !c.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_dir() {
        let config = Config::from_data_dir("/tmp/test-scrolls");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/test-scrolls"));
        assert_eq!(
            config.collection_file,
            PathBuf::from("/tmp/test-scrolls/scrolls.json")
        );
        assert_eq!(
            config.images_dir,
            PathBuf::from("/tmp/test-scrolls/screenshots")
        );
        assert!(config.capture_command.is_none());
    }

    #[test]
    fn test_from_home_uses_default_dir_name() {
        if let Ok(config) = Config::from_home() {
            assert!(config.data_dir.ends_with(DEFAULT_DIR_NAME));
        }
    }

    #[test]
    fn test_blank_capture_command_is_ignored() {
        let config = Config::from_data_dir("/tmp/x").with_capture_command(Some("  ".into()));
        assert!(config.capture_command.is_none());
        let config = Config::from_data_dir("/tmp/x").with_capture_command(Some("grim".into()));
        assert_eq!(config.capture_command.as_deref(), Some("grim"));
    }
}
