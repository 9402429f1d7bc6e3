//! File/code adapted from https://github.com/jamjamjon/usls
//!
//! Well-known directories on the system, with or without the `fire_detect` subdirectory.

use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "fire_detect";

#[derive(Debug)]
pub enum FsAccess {
    Config,
    Current,
}

impl FsAccess {
    /// Base path for the directory type. Unless `raw`, the `fire_detect`
    /// subdirectory is appended.
    fn get_path(&self, raw: bool) -> anyhow::Result<PathBuf> {
        let base_path = match self {
            FsAccess::Config => dirs::config_dir(),
            FsAccess::Current => std::env::current_dir().ok(),
        };

        let mut path = base_path.ok_or_else(|| {
            anyhow::anyhow!("Unsupported operating system. Supported OS: Linux, MacOS, Windows.")
        })?;

        if !raw {
            path.push(APP_DIR);
        }
        Ok(path)
    }

    /// Path of the application directory, without creating it.
    ///
    /// Example: `~/.config/fire_detect`.
    pub fn app_path(&self) -> anyhow::Result<PathBuf> {
        self.get_path(false)
    }

    pub fn raw_path(&self) -> anyhow::Result<PathBuf> {
        self.get_path(true)
    }

    /// Creates the specified directory if it does not exist.
    pub fn create_directory(path: &Path) -> anyhow::Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }
        Ok(())
    }
}
