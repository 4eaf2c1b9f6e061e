use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".sipscribe";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "tastings.sqlite";
/// Default destination for export documents, relative to the data directory.
const EXPORT_DIR_NAME: &str = "exports";
/// Log file written while the TUI owns the terminal.
const LOG_FILE_NAME: &str = "sipscribe.log";
/// Environment variable that relocates the whole data directory.
pub const DATA_DIR_ENV: &str = "SIPSCRIBE_HOME";

/// Resolved on-disk layout for one journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the data directory with this precedence: explicit override
    /// (the `--data-dir` flag), `SIPSCRIBE_HOME`, then `~/.sipscribe`.
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = override_dir {
            return Ok(Self::at(dir));
        }

        if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::at(PathBuf::from(dir)));
        }

        let base_dirs =
            BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
        Ok(Self::at(base_dirs.home_dir().join(DATA_DIR_NAME)))
    }

    /// Use `data_dir` as-is.
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join(EXPORT_DIR_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE_NAME)
    }

    /// Create the data directory if it is missing.
    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("failed to create data directory {}", self.data_dir.display())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_wins() {
        let paths = AppPaths::resolve(Some(PathBuf::from("/tmp/journal"))).unwrap();
        assert_eq!(paths.data_dir(), Path::new("/tmp/journal"));
        assert_eq!(
            paths.database_path(),
            PathBuf::from("/tmp/journal/tastings.sqlite")
        );
        assert_eq!(paths.export_dir(), PathBuf::from("/tmp/journal/exports"));
        assert_eq!(paths.log_path(), PathBuf::from("/tmp/journal/sipscribe.log"));
    }

    #[test]
    fn ensure_data_dir_creates_missing_folders() {
        let root = tempfile::tempdir().unwrap();
        let paths = AppPaths::at(root.path().join("nested").join("journal"));
        paths.ensure_data_dir().unwrap();
        assert!(paths.data_dir().is_dir());
    }
}
