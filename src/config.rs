//! Loading UI configuration from TOML plus environment overrides.
//!
//! See `UiConfig` for the expected schema. Every field is optional; a missing or
//! broken file falls back to defaults.

use serde::Deserialize;
use tracing::{error, info};

/// Which listing route the backend exposes for providers.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CatalogRoute {
  #[default]
  Providers,
  Agents,
}

impl CatalogRoute {
  pub fn segment(self) -> &'static str {
    match self {
      CatalogRoute::Providers => "providers",
      CatalogRoute::Agents => "agents",
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UiConfig {
  /// Base URL of the question backend, e.g. "http://localhost:10001".
  pub backend_url: String,
  pub catalog_route: CatalogRoute,
  /// None keeps reqwest's transport default (no overall timeout).
  pub request_timeout_secs: Option<u64>,
  /// Masked value the env-key check hands out in place of a real key.
  pub key_sentinel: String,
  pub max_sessions: usize,
  pub static_dir: String,
  pub title: String,
  /// Serve canned backend endpoints from this process.
  pub mock_backend: bool,
  pub port: u16,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      backend_url: "http://localhost:10001".into(),
      catalog_route: CatalogRoute::Providers,
      request_timeout_secs: None,
      key_sentinel: "********".into(),
      max_sessions: 1000,
      static_dir: "./static".into(),
      title: "Interview Question Generator".into(),
      mock_backend: false,
      port: 10000,
    }
  }
}

impl UiConfig {
  /// Env overrides win over the TOML file: BACKEND_URL, PORT, MOCK_BACKEND.
  pub fn apply_env(mut self) -> Self {
    if let Ok(url) = std::env::var("BACKEND_URL") {
      if !url.trim().is_empty() {
        self.backend_url = url.trim().trim_end_matches('/').to_string();
      }
    }
    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
      self.port = port;
    }
    if let Ok(flag) = std::env::var("MOCK_BACKEND") {
      self.mock_backend = matches!(flag.trim(), "1" | "true" | "yes");
    }
    self
  }
}

pub fn parse_ui_config(s: &str) -> Result<UiConfig, toml::de::Error> {
  toml::from_str::<UiConfig>(s)
}

/// Load `UiConfig` from UI_CONFIG_PATH (if set), then apply env overrides.
/// IO/parse errors are logged and the defaults are used.
pub fn load_ui_config_from_env() -> UiConfig {
  let base = match std::env::var("UI_CONFIG_PATH").ok() {
    None => UiConfig::default(),
    Some(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match parse_ui_config(&s) {
        Ok(cfg) => {
          info!(target: "qgen_ui", %path, "Loaded UI config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "qgen_ui", %path, error = %e, "Failed to parse TOML config");
          UiConfig::default()
        }
      },
      Err(e) => {
        error!(target: "qgen_ui", %path, error = %e, "Failed to read TOML config file");
        UiConfig::default()
      }
    },
  };
  base.apply_env()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg = parse_ui_config("backend_url = \"http://mcp:9000\"\ncatalog_route = \"agents\"\n").unwrap();
    assert_eq!(cfg.backend_url, "http://mcp:9000");
    assert_eq!(cfg.catalog_route, CatalogRoute::Agents);
    assert_eq!(cfg.key_sentinel, "********");
    assert_eq!(cfg.request_timeout_secs, None);
    assert_eq!(cfg.port, 10000);
  }

  #[test]
  fn unknown_catalog_route_is_rejected() {
    assert!(parse_ui_config("catalog_route = \"bots\"").is_err());
  }
}
