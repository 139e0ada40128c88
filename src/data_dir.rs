//! On-disk layout: two redb files and the published index under one root.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment override for the data root.
pub const DATA_DIR_ENV: &str = "COUNSEL_DATA_DIR";

const XDG_PREFIX: &str = "counsel-search";

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Pick the root directory and make sure it exists.
    ///
    /// `--data-dir` wins over `COUNSEL_DATA_DIR`, which wins over
    /// `$XDG_DATA_HOME/counsel-search`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = match explicit {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(DATA_DIR_ENV) {
                Some(val) => PathBuf::from(val),
                None => xdg_data_home()?,
            },
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persisted search settings.
    pub fn config_db(&self) -> PathBuf {
        self.root.join("config.redb")
    }

    /// Threads and messages loaded by `import`.
    pub fn messages_db(&self) -> PathBuf {
        self.root.join("messages.redb")
    }

    /// Path of the published index file. The parent directory is created
    /// so the builder can stage its temp file next to it.
    pub fn index_path(&self) -> Result<PathBuf> {
        let dir = self.root.join("index");
        std::fs::create_dir_all(&dir)
            .map_err(|_| Error::DataDir(dir.clone()))?;
        Ok(dir.join("search_index.json"))
    }
}

fn xdg_data_home() -> Result<PathBuf> {
    xdg::BaseDirectories::with_prefix(XDG_PREFIX)
        .get_data_home()
        .ok_or_else(|| Error::Config("no XDG data home for this user".into()))
}
