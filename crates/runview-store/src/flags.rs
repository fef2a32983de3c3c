use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::FetchError;
use crate::http::{ApiClient, HttpConfig};

/// Platform flag holding how many days execution logs are kept.
pub const RETENTION_DAYS_FLAG: &str = "EXECUTION_DATA_RETENTION_DAYS";

/// Source of platform flags.
#[async_trait]
pub trait FlagSource: Send + Sync {
  /// Days execution data is retained, if the platform reports it.
  async fn retention_days(&self) -> Result<Option<u32>, FetchError>;
}

/// A flag source with fixed values.
#[derive(Debug, Clone, Default)]
pub struct StaticFlagSource {
  retention_days: Option<u32>,
}

impl StaticFlagSource {
  pub fn new(retention_days: Option<u32>) -> Self {
    Self { retention_days }
  }
}

#[async_trait]
impl FlagSource for StaticFlagSource {
  async fn retention_days(&self) -> Result<Option<u32>, FetchError> {
    Ok(self.retention_days)
  }
}

/// Reads flags from `GET {api_url}/v1/flags`.
#[derive(Debug, Clone)]
pub struct HttpFlagSource {
  api: ApiClient,
}

impl HttpFlagSource {
  pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
    Ok(Self {
      api: ApiClient::new(config)?,
    })
  }
}

#[async_trait]
impl FlagSource for HttpFlagSource {
  #[instrument(skip(self))]
  async fn retention_days(&self) -> Result<Option<u32>, FetchError> {
    let url = self.api.endpoint(&["v1", "flags"]);
    let flags: HashMap<String, serde_json::Value> = self.api.get_json(url, "flags").await?;
    Ok(flags.get(RETENTION_DAYS_FLAG).and_then(parse_days))
  }
}

/// Flags arrive untyped; accept numbers and numeric strings.
fn parse_days(value: &serde_json::Value) -> Option<u32> {
  let days = match value {
    serde_json::Value::Number(n) => n.as_u64(),
    serde_json::Value::String(s) => s.trim().parse().ok(),
    serde_json::Value::Null => return None,
    _ => None,
  };
  let days = days.and_then(|d| u32::try_from(d).ok());
  if days.is_none() {
    warn!(flag = RETENTION_DAYS_FLAG, value = %value, "ignoring malformed flag value");
  }
  days
}
