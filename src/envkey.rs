//! Environment key checker: asks the backend whether it holds a key for the
//! selected provider and derives the API-key input's state from the answer.
//!
//! The key itself only ever lands in the input's `value` attribute. It is not
//! logged and `Debug` redacts it.

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::protocol::EnvKeyOut;

pub const DEFAULT_PLACEHOLDER: &str = "Enter your API key";
pub const ENV_PLACEHOLDER: &str = "Using environment API key";

#[derive(Clone, Default, PartialEq)]
pub struct KeyInputState {
  pub value: String,
  pub env_sourced: bool,
  /// Hint shown under the input, e.g. who pays for the env key.
  pub credit: Option<String>,
}

impl KeyInputState {
  pub fn from_check(out: EnvKeyOut) -> Self {
    if !out.exists {
      return Self::default();
    }
    Self {
      value: out.api_key.unwrap_or_default(),
      env_sourced: true,
      credit: out.credit.filter(|c| !c.trim().is_empty()),
    }
  }

  pub fn placeholder(&self) -> &'static str {
    if self.env_sourced { ENV_PLACEHOLDER } else { DEFAULT_PLACEHOLDER }
  }
}

impl std::fmt::Debug for KeyInputState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("KeyInputState")
      .field("has_value", &!self.value.is_empty())
      .field("env_sourced", &self.env_sourced)
      .field("credit", &self.credit)
      .finish()
  }
}

/// Any failure leaves the input in its default state.
pub async fn check(backend: &Backend, provider: &str) -> KeyInputState {
  if provider.trim().is_empty() {
    return KeyInputState::default();
  }
  match backend.check_env_key(provider).await {
    Ok(out) => {
      let state = KeyInputState::from_check(out);
      debug!(target: "catalog", %provider, env_sourced = state.env_sourced, "Env key checked");
      state
    }
    Err(e) => {
      warn!(target: "catalog", %provider, error = %e, "Env key check failed");
      KeyInputState::default()
    }
  }
}
