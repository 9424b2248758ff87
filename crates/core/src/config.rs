//! Application configuration for vaultqa.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - The workspace config file (`.vaultqa/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the index artifact and the
//! engine settings live under `.vaultqa/` in the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".vaultqa";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .vaultqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the workspace config file and the
    /// environment.
    ///
    /// Environment variables:
    /// - `VAULTQA_WORKSPACE`: Override workspace path
    /// - `VAULTQA_CONFIG`: Path to config file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use vaultqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with_file(None)
    }

    /// Like [`load`](Self::load), but reads `config_file` instead of the
    /// default file location when given.
    pub fn load_with_file(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("VAULTQA_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("VAULTQA_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if config_file.is_some() {
            config.config_file = config_file;
        }

        config = config.merge_file()?;

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge the YAML config file, if one exists, into this config.
    fn merge_file(self) -> AppResult<Self> {
        let config_path = self
            .config_file
            .clone()
            .unwrap_or_else(|| self.state_dir().join("config.yaml"));

        if !config_path.exists() {
            return Ok(self);
        }

        self.merge_yaml(&config_path)
    }

    fn merge_yaml(mut self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        Ok(self)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over the file and the environment.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Check that the workspace directory exists.
    pub fn validate(&self) -> AppResult<()> {
        if !self.workspace.is_dir() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                self.workspace
            )));
        }
        Ok(())
    }

    /// Get the path to the .vaultqa directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .vaultqa directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
            tracing::debug!("Created state directory {:?}", state_dir);
        }
        Ok(())
    }
}
