//! Where recordings live on disk.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Which medium recordings are stored on.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageTarget {
    /// The system SD card.
    #[default]
    Primary,
    /// A removable USB drive.
    Removable,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub target: StorageTarget,
    pub primary_dir: PathBuf,
    pub removable_dir: PathBuf,
    /// File extension of recordings, without the dot.
    pub extension: String,
}

impl Storage {
    pub fn dir(&self) -> &PathBuf {
        match self.target {
            StorageTarget::Primary => &self.primary_dir,
            StorageTarget::Removable => &self.removable_dir,
        }
    }

    /// Gets the path of the recording named `id` on the selected medium.
    pub fn resolve(&self, id: &str) -> PathBuf {
        self.dir().join(format!("{}.{}", id, self.extension))
    }
}

impl Default for Storage {
    fn default() -> Self {
        Storage {
            target: StorageTarget::Primary,
            primary_dir: PathBuf::from("/home/pi/records/onboardSD/"),
            removable_dir: PathBuf::from("/home/pi/records/usb/"),
            extension: "wav".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn resolves_into_selected_medium() {
        let mut storage = Storage::default();
        assert_eq!(storage.resolve("0042"), Path::new("/home/pi/records/onboardSD/0042.wav"));

        storage.target = StorageTarget::Removable;
        assert_eq!(storage.resolve("0042"), Path::new("/home/pi/records/usb/0042.wav"));
    }

    #[test]
    fn resolving_is_repeatable() {
        let storage = Storage {
            target: StorageTarget::Removable,
            ..Storage::default()
        };

        assert_eq!(storage.resolve("1234567"), storage.resolve("1234567"));
    }
}
