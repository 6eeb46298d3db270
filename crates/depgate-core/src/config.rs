use crate::client::DEFAULT_API_URL;
use crate::engine::{EngineSettings, DEFAULT_MAX_CONNECTION_ATTEMPTS};
use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Lower bound applied to `poll_interval_ms`.
pub const MIN_POLL_INTERVAL_MS: u64 = 3_000;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_connection_attempts")]
    pub max_connection_attempts: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub include_dev_dependencies: bool,
    /// Project name reported to the service; defaults to the root directory name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_enabled() -> bool {
    true
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_max_connection_attempts() -> u32 {
    DEFAULT_MAX_CONNECTION_ATTEMPTS
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_url: default_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_connection_attempts: default_max_connection_attempts(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            include_dev_dependencies: false,
            project: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load `.depgate/config.yaml`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let Some(data) = crate::io::read_optional(&paths::config_path(root))? else {
            return Ok(Self::default());
        };
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Write the default config unless one exists; `force` overwrites.
    /// Returns `true` if the file was written.
    pub fn init(root: &Path, force: bool) -> Result<bool> {
        let defaults = Self::default();
        if force {
            defaults.save(root)?;
            return Ok(true);
        }
        let data = serde_yaml::to_string(&defaults)?;
        crate::io::write_if_missing(&paths::config_path(root), data.as_bytes())
    }

    /// Poll interval with the minimum applied.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn project_name(&self, root: &Path) -> String {
        if let Some(p) = self.project.as_deref().filter(|p| !p.trim().is_empty()) {
            return p.trim().to_string();
        }
        root.canonicalize()
            .ok()
            .as_deref()
            .unwrap_or(root)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }

    pub fn engine_settings(&self, root: &Path) -> EngineSettings {
        EngineSettings {
            enabled: self.enabled,
            poll_interval: self.poll_interval(),
            retry_interval: self.poll_interval(),
            max_connection_attempts: self.max_connection_attempts.max(1),
            project: self.project_name(root),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let url = self.api_url.trim();
        if url.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "api_url is empty".to_string(),
            });
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("api_url '{url}' must start with http:// or https://"),
            });
        }

        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "poll_interval_ms {} is below the minimum; {} will be used",
                    self.poll_interval_ms, MIN_POLL_INTERVAL_MS
                ),
            });
        }

        if self.max_connection_attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_connection_attempts is 0; 1 will be used".to_string(),
            });
        }

        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "timeouts of 0 seconds are raised to 1".to_string(),
            });
        }

        warnings
    }
}
