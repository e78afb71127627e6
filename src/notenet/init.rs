use crate::app::NotesApp;
use crate::config::{ModelAliases, NotenetConfig, MODEL_FILENAME};
use crate::error::{NotesError, Result};
use crate::network::fs::FileNetwork;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Overrides the OS data directory.
pub const HOME_ENV: &str = "NOTENET_HOME";

const NETWORK_DIR: &str = "network";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotenetPaths {
    pub data_dir: PathBuf,
}

impl NotenetPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn model_file(&self) -> PathBuf {
        self.data_dir.join(MODEL_FILENAME)
    }

    /// Root of the local document network.
    pub fn network_dir(&self) -> PathBuf {
        self.data_dir.join(NETWORK_DIR)
    }
}

pub struct NotenetContext {
    pub paths: NotenetPaths,
    pub config: NotenetConfig,
    pub network: FileNetwork,
}

impl NotenetContext {
    pub fn aliases(&self) -> Result<ModelAliases> {
        ModelAliases::load(self.paths.model_file())
    }

    /// A controller over the local network, using the configured placeholder
    /// text as fallback.
    pub fn app(&self) -> Result<NotesApp<FileNetwork>> {
        let aliases = self.aliases()?;
        Ok(NotesApp::new(self.network.clone(), aliases)
            .with_placeholder_text(self.config.placeholder_text.clone()))
    }
}

/// `home` when given (normally from `NOTENET_HOME`), else the OS data dir.
pub fn resolve_data_dir(home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(home) = home.filter(|h| !h.as_os_str().is_empty()) {
        return Ok(home);
    }
    let proj_dirs = ProjectDirs::from("com", "notenet", "notenet")
        .ok_or_else(|| NotesError::Config("Could not determine data dir".to_string()))?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

pub fn initialize(data_dir: &Path) -> Result<NotenetContext> {
    let paths = NotenetPaths::new(data_dir);
    let config = NotenetConfig::load(&paths.data_dir)?;
    let network = FileNetwork::new(paths.network_dir());
    tracing::debug!(data_dir = %paths.data_dir.display(), "initialized");

    Ok(NotenetContext {
        paths,
        config,
        network,
    })
}
