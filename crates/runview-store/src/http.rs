use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use runview_run::FlowRun;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{FetchError, RunSource};

/// Connection settings for the backend API.
#[derive(Debug, Clone)]
pub struct HttpConfig {
  /// Base URL of the API, e.g. `https://cloud.example.com/api`.
  pub api_url: String,
  /// Bearer token sent with every request.
  pub api_token: Option<String>,
  pub timeout: Duration,
}

/// Shared JSON-over-HTTP plumbing for the backend API.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
  client: Client,
  base_url: Url,
  api_token: Option<String>,
}

impl ApiClient {
  pub(crate) fn new(config: &HttpConfig) -> Result<Self, FetchError> {
    let base_url = Url::parse(&config.api_url)?;
    if base_url.cannot_be_a_base() {
      return Err(FetchError::InvalidUrl(
        url::ParseError::RelativeUrlWithCannotBeABaseBase,
      ));
    }

    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| FetchError::Client(e.to_string()))?;

    Ok(Self {
      client,
      base_url,
      api_token: config.api_token.clone(),
    })
  }

  /// Build an endpoint URL below the base, percent-encoding each segment.
  pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  /// GET a JSON document. `subject` names the resource in `NotFound` errors.
  pub(crate) async fn get_json<T: DeserializeOwned>(
    &self,
    url: Url,
    subject: &str,
  ) -> Result<T, FetchError> {
    let mut request = self.client.get(url.clone());
    if let Some(token) = &self.api_token {
      request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| {
      warn!(url = %url, error = %e, "request failed");
      FetchError::Transient(e.to_string())
    })?;

    let status = response.status();
    debug!(url = %url, status = status.as_u16(), "received response");

    if status == StatusCode::NOT_FOUND {
      return Err(FetchError::NotFound(subject.to_string()));
    }
    if status.is_server_error() {
      let body = response.text().await.unwrap_or_default();
      return Err(FetchError::Transient(format!("{}: {}", status, body)));
    }
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(FetchError::Http {
        status: status.as_u16(),
        body,
      });
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| FetchError::Transient(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
  }
}

/// Fetches runs from `GET {api_url}/v1/flow-runs/{run_id}`.
#[derive(Debug, Clone)]
pub struct HttpRunSource {
  api: ApiClient,
}

impl HttpRunSource {
  pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
    Ok(Self {
      api: ApiClient::new(config)?,
    })
  }
}

#[async_trait]
impl RunSource for HttpRunSource {
  #[instrument(skip(self))]
  async fn fetch_populated_run(&self, run_id: &str) -> Result<FlowRun, FetchError> {
    let url = self.api.endpoint(&["v1", "flow-runs", run_id]);
    self.api.get_json(url, run_id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn source(api_url: &str) -> ApiClient {
    ApiClient::new(&HttpConfig {
      api_url: api_url.to_string(),
      api_token: None,
      timeout: Duration::from_secs(1),
    })
    .unwrap()
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let source1 = source("http://localhost:3000/api/");
    let url = source1.endpoint(&["v1", "flow-runs", "run-1"]);
    assert_eq!(url.as_str(), "http://localhost:3000/api/v1/flow-runs/run-1");

    let source2 = source("http://localhost:3000/api");
    let url = source2.endpoint(&["v1", "flow-runs", "run-1"]);
    assert_eq!(url.as_str(), "http://localhost:3000/api/v1/flow-runs/run-1");
  }

  #[test]
  fn test_endpoint_encodes_run_id() {
    let source = source("http://localhost:3000");
    let url = source.endpoint(&["v1", "flow-runs", "a/b"]);
    assert_eq!(url.as_str(), "http://localhost:3000/v1/flow-runs/a%2Fb");
  }

  #[test]
  fn test_rejects_invalid_base() {
    let result = ApiClient::new(&HttpConfig {
      api_url: "mailto:ops@example.com".to_string(),
      api_token: None,
      timeout: Duration::from_secs(1),
    });
    assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
  }
}
