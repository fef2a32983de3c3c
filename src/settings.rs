use std::path::{Path, PathBuf};
use std::time::Duration;

use runview_store::HttpConfig;
use serde::{Deserialize, Serialize};

const SETTINGS_FILE: &str = "config.json";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
  #[error("failed to read settings file {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("failed to parse settings file {path}: {source}")]
  Parse {
    path: PathBuf,
    source: serde_json::Error,
  },
}

/// Settings read from `{data_dir}/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Base URL of the backend API. Without it runs can only be loaded from
  /// files.
  pub api_url: Option<String>,
  /// Websocket endpoint streaming live run updates.
  pub socket_url: Option<String>,
  pub api_token: Option<String>,
  pub request_timeout_ms: u64,
  /// Overrides the retention days reported by the platform flags.
  pub retention_days: Option<u32>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      api_url: None,
      socket_url: None,
      api_token: None,
      request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
      retention_days: None,
    }
  }
}

impl Settings {
  /// Load settings from the data directory. A missing file yields defaults.
  pub fn load(data_dir: &Path) -> Result<Self, SettingsError> {
    let path = data_dir.join(SETTINGS_FILE);
    let content = match std::fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(source) => return Err(SettingsError::Read { path, source }),
    };
    serde_json::from_str(&content).map_err(|source| SettingsError::Parse { path, source })
  }

  /// HTTP settings for the backend API, if one is configured.
  pub fn http_config(&self) -> Option<HttpConfig> {
    self.api_url.as_ref().map(|api_url| HttpConfig {
      api_url: api_url.clone(),
      api_token: self.api_token.clone(),
      timeout: Duration::from_millis(self.request_timeout_ms),
    })
  }
}
