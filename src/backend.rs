//! HTTP client for the question backend.
//!
//! Every call goes through `send`, which turns transport failures, non-2xx
//! statuses and `{success:false}` envelopes into a classified `UiError`.
//! Calls are instrumented with endpoint and latency, never with keys or bodies.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{CatalogRoute, UiConfig};
use crate::domain::ModelEntry;
use crate::error::{BackendErrorKind, Result, UiError};
use crate::protocol::{DescriptionOut, EnvKeyOut, Envelope, ModelsOut, ProvidersOut};
use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct Backend {
  client: reqwest::Client,
  pub base_url: Url,
  catalog_route: CatalogRoute,
}

impl Backend {
  pub fn from_config(cfg: &UiConfig) -> Result<Self> {
    let base_url = Url::parse(&cfg.backend_url)
      .map_err(|e| UiError::Setup(format!("invalid backend_url '{}': {e}", cfg.backend_url)))?;
    if base_url.cannot_be_a_base() {
      return Err(UiError::Setup(format!("backend_url '{}' cannot carry paths", cfg.backend_url)));
    }

    let mut builder = reqwest::Client::builder().user_agent("qgen-ui/0.1");
    if let Some(secs) = cfg.request_timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build()?;

    Ok(Self { client, base_url, catalog_route: cfg.catalog_route })
  }

  /// Base URL plus percent-encoded path segments.
  fn url(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| UiError::Setup("backend_url cannot carry paths".into()))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  pub async fn get_json(&self, segments: &[&str]) -> Result<Value> {
    let url = self.url(segments)?;
    self.send(self.client.get(url)).await
  }

  /// POST a JSON body; `bearer` becomes `Authorization: Bearer <key>` when present.
  pub async fn post_json<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B, bearer: Option<&str>) -> Result<Value> {
    let url = self.url(segments)?;
    let mut req = self.client.post(url).header(CONTENT_TYPE, "application/json").json(body);
    if let Some(key) = bearer {
      req = req.header(AUTHORIZATION, format!("Bearer {key}"));
    }
    self.send(req).await
  }

  async fn send(&self, req: RequestBuilder) -> Result<Value> {
    let start = Instant::now();
    let res = req.send().await?;
    let status = res.status();
    let url = res.url().path().to_string();
    let body = res.text().await?;
    debug!(target: "qgen_ui", %url, %status, elapsed = ?start.elapsed(), body_len = body.len(), "Backend responded");

    if !status.is_success() {
      let err = classify_failure(status, &body);
      warn!(target: "qgen_ui", %url, %status, error = %err, "Backend call failed");
      return Err(err);
    }

    let value: Value = serde_json::from_str(&body)
      .map_err(|e| UiError::ResponseFormat(format!("{url}: {e}; body: {}", trunc_for_log(&body, 200))))?;
    if let Ok(env) = serde_json::from_value::<Envelope>(value.clone()) {
      if env.is_failure() {
        return Err(envelope_error(env));
      }
    }
    Ok(value)
  }

  // --- Catalog helpers ---

  #[instrument(level = "debug", skip(self), fields(route = self.catalog_route.segment()))]
  pub async fn providers(&self) -> Result<Vec<String>> {
    let v = self.get_json(&["api", self.catalog_route.segment()]).await?;
    let out: ProvidersOut = decode(v, "provider list")?;
    Ok(out.into_list())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn models(&self, provider: &str) -> Result<Vec<ModelEntry>> {
    let v = self.get_json(&["api", "models", provider]).await?;
    let out: ModelsOut = decode(v, "model list")?;
    Ok(out.into_entries())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn model_description(&self, provider: &str, model: &str) -> Result<Option<String>> {
    let v = self.get_json(&["api", "model-description", provider, model]).await?;
    let out: DescriptionOut = decode(v, "model description")?;
    Ok(out.description.filter(|d| !d.trim().is_empty()))
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn check_env_key(&self, provider: &str) -> Result<EnvKeyOut> {
    let v = self.get_json(&["api", "check-env-key", provider]).await?;
    decode(v, "env key check")
  }
}

pub fn decode<T: DeserializeOwned>(v: Value, what: &str) -> Result<T> {
  serde_json::from_value(v).map_err(|e| UiError::ResponseFormat(format!("{what}: {e}")))
}

/// Pull `data` out of a success envelope and decode it.
pub fn take_data<T: DeserializeOwned>(v: Value, what: &str) -> Result<T> {
  let data = match v {
    Value::Object(mut map) => map.remove("data"),
    _ => None,
  };
  match data {
    Some(d) if !d.is_null() => decode(d, what),
    _ => Err(UiError::ResponseFormat(format!("{what} response carries no data"))),
  }
}

fn envelope_error(env: Envelope) -> UiError {
  UiError::Backend {
    kind: BackendErrorKind::from_error_type(env.error_type.as_deref()),
    message: env.error.unwrap_or_else(|| "The backend reported a failure.".into()),
    details: env.details.map(|d| match d {
      Value::String(s) => s,
      other => other.to_string(),
    }),
  }
}

/// Non-2xx: use the error envelope when there is one, else classify by status.
fn classify_failure(status: StatusCode, body: &str) -> UiError {
  if let Ok(env) = serde_json::from_str::<Envelope>(body) {
    if env.error.is_some() || env.error_type.is_some() {
      return envelope_error(env);
    }
  }
  let kind = match status {
    StatusCode::TOO_MANY_REQUESTS => BackendErrorKind::RateLimit,
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendErrorKind::ApiKey,
    StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendErrorKind::Timeout,
    StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => BackendErrorKind::Network,
    s if s.is_client_error() => BackendErrorKind::Request,
    _ => BackendErrorKind::Server,
  };
  UiError::Backend {
    kind,
    message: format!("HTTP {status}"),
    details: if body.trim().is_empty() { None } else { Some(trunc_for_log(body, 500)) },
  }
}
