//! Where rowmirror keeps its files.
//!
//! ```text
//! <base>/config.json
//! <base>/<database_file>      relative names only
//! <base>/logs/rowmirror.jsonl
//! ```

use std::path::{Path, PathBuf};

use crate::{CoreError, CoreResult};

const BASE_DIR_NAME: &str = ".rowmirror";
const LOG_FILE_NAME: &str = "rowmirror.jsonl";

#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Rooted at `~/.rowmirror`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| CoreError::Path("no home directory for this user".to_string()))?;
        Ok(Self::with_base_dir(home.join(BASE_DIR_NAME)))
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Resolves a configured database name. Absolute names are used as given.
    pub fn database_file(&self, name: &str) -> PathBuf {
        let name = Path::new(name);
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.base_dir.join(name)
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// JSON-lines log file. Only written once `logs_dir` exists.
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Creates the base and logs directories. Safe to repeat.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
