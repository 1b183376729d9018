//! Request dispatcher: turns a user action plus the current form into exactly
//! one backend call and one outcome.
//!
//!   - Submit → /api/validate when validation is on, else /api/generate
//!   - Quiz   → /api/user-quiz when a quiz style is chosen, else /api/quiz
//!
//! Setup problems are reported before any network traffic. Responses are
//! tagged with a per-area ticket so a slow, superseded answer can be dropped.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::backend::{take_data, Backend};
use crate::domain::{FormState, GenerationResult, QuizResult, ValidationResult};
use crate::error::{Result, UiError};
use crate::form::is_real_key;
use crate::protocol::{GenerateIn, GenerationData, QuizContext, QuizData, QuizIn, ValidationData};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
  Submit,
  Quiz,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
  Generate,
  Validate,
  Quiz,
  UserQuiz,
}

impl Endpoint {
  pub fn choose(action: Action, form: &FormState) -> Endpoint {
    match action {
      Action::Submit if form.validation_enabled => Endpoint::Validate,
      Action::Submit => Endpoint::Generate,
      Action::Quiz if form.quiz_style.is_some() => Endpoint::UserQuiz,
      Action::Quiz => Endpoint::Quiz,
    }
  }

  pub fn segments(self) -> [&'static str; 2] {
    match self {
      Endpoint::Generate => ["api", "generate"],
      Endpoint::Validate => ["api", "validate"],
      Endpoint::Quiz => ["api", "quiz"],
      Endpoint::UserQuiz => ["api", "user-quiz"],
    }
  }

  pub fn path(self) -> String {
    format!("/{}", self.segments().join("/"))
  }
}

/// What a successful dispatch produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
  Generation(GenerationResult),
  Validation(ValidationResult),
  Quiz(QuizResult),
}

/// The key to send as a bearer token, if the field holds a real one.
pub fn bearer_token<'a>(key: &'a str, sentinel: &str) -> Option<&'a str> {
  if is_real_key(key, sentinel) { Some(key.trim()) } else { None }
}

/// Checks that run before any request leaves the process.
pub fn check_ready(form: &FormState) -> Result<()> {
  if form.provider.trim().is_empty() {
    return Err(UiError::Setup("No provider selected.".into()));
  }
  if form.model.trim().is_empty() {
    return Err(UiError::Setup("No model selected.".into()));
  }
  if !form.can_submit() {
    return Err(UiError::Setup("Enter a topic and platform, or a question.".into()));
  }
  Ok(())
}

/// Key for the request body and bearer header. Validation uses the override
/// key, or the generation key when it targets the same provider.
pub fn request_key<'a>(form: &'a FormState, endpoint: Endpoint, sentinel: &str) -> Option<&'a str> {
  if endpoint != Endpoint::Validate {
    return bearer_token(&form.api_key, sentinel);
  }
  let (provider, _) = form.validation_target();
  form
    .validation_override
    .as_ref()
    .and_then(|o| bearer_token(&o.api_key, sentinel))
    .or_else(|| if provider == form.provider { bearer_token(&form.api_key, sentinel) } else { None })
}

/// Generate and validate share one body. The backend reads the AI settings
/// from the top-level `provider`/`model`/`apiKey`, so validation puts its
/// target there.
pub fn generate_payload<'a>(form: &'a FormState, endpoint: Endpoint, sentinel: &str) -> GenerateIn<'a> {
  let api_key = request_key(form, endpoint, sentinel);
  let mut body = GenerateIn {
    topic: &form.topic,
    platform: &form.platform,
    tech: &form.technology,
    keywords: &form.keywords,
    provider: &form.provider,
    model: &form.model,
    api_key,
    validation: form.validation_enabled,
    question: &form.question_context,
    validation_provider: None,
    validation_model: None,
    validation_api_key: None,
  };
  if endpoint == Endpoint::Validate {
    let (provider, model) = form.validation_target();
    body.provider = provider;
    body.model = model;
    body.validation_provider = Some(provider);
    body.validation_model = Some(model);
    body.validation_api_key = api_key;
  }
  body
}

pub fn quiz_payload<'a>(form: &'a FormState, sentinel: &str) -> QuizIn<'a> {
  let question = form.question_context.trim();
  QuizIn {
    provider: &form.provider,
    model: &form.model,
    api_key: bearer_token(&form.api_key, sentinel),
    context: QuizContext {
      platform: &form.platform,
      technology: &form.technology,
      topic: &form.topic,
      tags: &form.keywords,
      question: if question.is_empty() { None } else { Some(question) },
      style: form.quiz_style.map(|s| s.as_str()),
    },
  }
}

/// Run one action against the backend.
#[instrument(
  level = "info",
  skip(backend, form, sentinel),
  fields(provider = %form.provider, model = %form.model, has_key = is_real_key(&form.api_key, sentinel))
)]
pub async fn dispatch(backend: &Backend, sentinel: &str, action: Action, form: &FormState) -> Result<Outcome> {
  check_ready(form)?;
  let endpoint = Endpoint::choose(action, form);
  let bearer = request_key(form, endpoint, sentinel);
  let segments = endpoint.segments();
  let start = Instant::now();

  let res = match endpoint {
    Endpoint::Generate | Endpoint::Validate => {
      let body = generate_payload(form, endpoint, sentinel);
      backend.post_json(&segments, &body, bearer).await
    }
    Endpoint::Quiz | Endpoint::UserQuiz => {
      let body = quiz_payload(form, sentinel);
      backend.post_json(&segments, &body, bearer).await
    }
  };

  let value = match res {
    Ok(v) => v,
    Err(e) => {
      warn!(target: "dispatch", endpoint = %endpoint.path(), elapsed = ?start.elapsed(), error = %e, "Dispatch failed");
      return Err(e);
    }
  };

  let outcome = match endpoint {
    Endpoint::Generate => {
      Outcome::Generation(take_data::<GenerationData>(value, "generation")?.into_result())
    }
    Endpoint::Validate => {
      Outcome::Validation(take_data::<ValidationData>(value, "validation")?.into_result())
    }
    Endpoint::Quiz | Endpoint::UserQuiz => Outcome::Quiz(take_data::<QuizData>(value, "quiz")?.into_result()),
  };
  info!(target: "dispatch", endpoint = %endpoint.path(), elapsed = ?start.elapsed(), "Dispatch ok");
  Ok(outcome)
}

/// Area name for the shared result panel.
pub const RESULT_AREA: &str = "result";
pub const PROVIDER_AREA: &str = "provider";
pub const MODEL_AREA: &str = "model";
/// The validation override sub-form.
pub const VALIDATION_AREA: &str = "validation";

pub fn quiz_area(context_key: &str) -> String {
  format!("quiz:{context_key}")
}

/// Monotonic tickets per display area. Only the latest ticket of an area may
/// write to it.
#[derive(Debug, Default)]
pub struct Sequencer {
  next: u64,
  latest: HashMap<String, u64>,
}

impl Sequencer {
  pub fn issue(&mut self, area: &str) -> u64 {
    self.next += 1;
    self.latest.insert(area.to_string(), self.next);
    self.next
  }

  pub fn is_latest(&self, area: &str, ticket: u64) -> bool {
    self.latest.get(area) == Some(&ticket)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
  };
  use serde_json::{json, Value};

  use super::*;
  use crate::backend::tests::{backend_for, serve};
  use crate::domain::{QuizStyle, Tier, ValidationOverride};

  const SENTINEL: &str = "********";

  fn arrays_form() -> FormState {
    FormState {
      platform: "iOS".into(),
      technology: "Swift".into(),
      topic: "Arrays".into(),
      keywords: vec!["arrays".into(), "swift".into()],
      provider: "openai".into(),
      model: "gpt-4".into(),
      ..FormState::default()
    }
  }

  /// Records (path, authorization header, body) of every POST.
  type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

  fn recording_backend(seen: Seen, reply: Value) -> Router {
    let handler = move |uri: axum::http::Uri, headers: HeaderMap, Json(body): Json<Value>| {
      let seen = seen.clone();
      let reply = reply.clone();
      async move {
        let auth = headers.get("authorization").and_then(|h| h.to_str().ok()).map(str::to_string);
        seen.lock().unwrap().push((uri.path().to_string(), auth, body));
        Json(reply)
      }
    };
    Router::new()
      .route("/api/generate", post(handler.clone()))
      .route("/api/validate", post(handler.clone()))
      .route("/api/quiz", post(handler.clone()))
      .route("/api/user-quiz", post(handler))
  }

  #[test]
  fn endpoint_choice() {
    let mut f = arrays_form();
    assert_eq!(Endpoint::choose(Action::Submit, &f), Endpoint::Generate);
    assert_eq!(Endpoint::choose(Action::Quiz, &f), Endpoint::Quiz);
    f.validation_enabled = true;
    f.quiz_style = Some(QuizStyle::Compare);
    assert_eq!(Endpoint::choose(Action::Submit, &f), Endpoint::Validate);
    assert_eq!(Endpoint::choose(Action::Quiz, &f), Endpoint::UserQuiz);
    assert_eq!(Endpoint::UserQuiz.path(), "/api/user-quiz");
  }

  #[test]
  fn bearer_only_for_real_keys() {
    assert_eq!(bearer_token("", SENTINEL), None);
    assert_eq!(bearer_token(SENTINEL, SENTINEL), None);
    assert_eq!(bearer_token(" sk-1 ", SENTINEL), Some("sk-1"));
  }

  #[test]
  fn setup_errors_come_first() {
    let mut f = arrays_form();
    f.model.clear();
    assert!(matches!(check_ready(&f), Err(UiError::Setup(_))));
    let mut f = arrays_form();
    f.topic.clear();
    assert!(matches!(check_ready(&f), Err(UiError::Setup(_))));
    assert!(check_ready(&arrays_form()).is_ok());
  }

  #[test]
  fn generate_payload_shape() {
    let f = arrays_form();
    let v = serde_json::to_value(generate_payload(&f, Endpoint::Generate, SENTINEL)).unwrap();
    assert_eq!(
      v,
      json!({
        "topic": "Arrays", "platform": "iOS", "tech": "Swift", "keywords": ["arrays", "swift"],
        "provider": "openai", "model": "gpt-4", "validation": false, "question": ""
      })
    );
  }

  #[test]
  fn validate_payload_uses_override_and_real_key_only() {
    let mut f = arrays_form();
    f.validation_enabled = true;
    f.validation_override = Some(ValidationOverride { provider: "google".into(), model: "gemini-pro".into(), api_key: SENTINEL.into() });
    let v = serde_json::to_value(generate_payload(&f, Endpoint::Validate, SENTINEL)).unwrap();
    assert_eq!(v["validationProvider"], "google");
    assert_eq!(v["validationModel"], "gemini-pro");
    assert!(v.get("validationApiKey").is_none());
    assert!(v.get("apiKey").is_none());

    f.same_settings = true;
    f.validation_override = None;
    let v = serde_json::to_value(generate_payload(&f, Endpoint::Validate, SENTINEL)).unwrap();
    assert_eq!(v["validationProvider"], "openai");
    assert_eq!(v["validationModel"], "gpt-4");
  }

  #[test]
  fn validate_override_goes_in_top_level_ai_fields() {
    let mut f = arrays_form();
    f.api_key = "sk-gen".into();
    f.validation_enabled = true;
    f.validation_override = Some(ValidationOverride { provider: "google".into(), model: "gemini-pro".into(), api_key: "g-key".into() });
    let v = serde_json::to_value(generate_payload(&f, Endpoint::Validate, SENTINEL)).unwrap();
    assert_eq!(v["provider"], "google");
    assert_eq!(v["model"], "gemini-pro");
    assert_eq!(v["apiKey"], "g-key");

    // Another provider without its own key falls back to the server key.
    f.validation_override = Some(ValidationOverride { provider: "google".into(), model: "gemini-pro".into(), api_key: String::new() });
    let v = serde_json::to_value(generate_payload(&f, Endpoint::Validate, SENTINEL)).unwrap();
    assert!(v.get("apiKey").is_none());

    // Same provider reuses the generation key.
    f.same_settings = true;
    f.validation_override = None;
    let v = serde_json::to_value(generate_payload(&f, Endpoint::Validate, SENTINEL)).unwrap();
    assert_eq!((v["provider"].as_str(), v["apiKey"].as_str()), (Some("openai"), Some("sk-gen")));
  }

  #[test]
  fn generate_payload_carries_real_key_in_body() {
    let mut f = arrays_form();
    f.api_key = " sk-gen ".into();
    let v = serde_json::to_value(generate_payload(&f, Endpoint::Generate, SENTINEL)).unwrap();
    assert_eq!(v["apiKey"], "sk-gen");
    assert_eq!(v["provider"], "openai");
  }

  #[test]
  fn quiz_payload_carries_style_and_question() {
    let mut f = arrays_form();
    f.quiz_style = Some(QuizStyle::Pitfall);
    f.question_context = "  What is copy-on-write? ".into();
    f.api_key = "sk-1".into();
    let v = serde_json::to_value(quiz_payload(&f, SENTINEL)).unwrap();
    assert_eq!(v["apiKey"], "sk-1");
    assert_eq!(v["context"]["style"], "Pitfall");
    assert_eq!(v["context"]["question"], "What is copy-on-write?");
    assert_eq!(v["context"]["technology"], "Swift");
  }

  #[test]
  fn sequencer_keeps_areas_apart() {
    let mut s = Sequencer::default();
    let a = s.issue(RESULT_AREA);
    let b = s.issue(RESULT_AREA);
    let q = s.issue(&quiz_area("ios|swift|arrays"));
    assert!(!s.is_latest(RESULT_AREA, a));
    assert!(s.is_latest(RESULT_AREA, b));
    assert!(s.is_latest(&quiz_area("ios|swift|arrays"), q));
    assert!(!s.is_latest("unknown", q));
  }

  #[tokio::test]
  async fn submit_posts_to_generate_without_auth_header() {
    let seen: Seen = Arc::default();
    let reply = json!({"success": true, "data": {"question": "What is an array?", "answerLevels": {"beginner": {"answer": "A list"}}}});
    let backend = backend_for(&serve(recording_backend(seen.clone(), reply)).await);

    let out = dispatch(&backend, SENTINEL, Action::Submit, &arrays_form()).await.unwrap();
    let Outcome::Generation(g) = out else { panic!("expected generation") };
    assert_eq!(g.answer_levels.keys().copied().collect::<Vec<_>>(), vec![Tier::Beginner]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "/api/generate");
    assert_eq!(seen[0].1, None);
    assert_eq!(seen[0].2["keywords"], json!(["arrays", "swift"]));
  }

  #[tokio::test]
  async fn real_key_sends_bearer_and_sentinel_does_not() {
    let seen: Seen = Arc::default();
    let reply = json!({"success": true, "data": {"quiz": {"question": "Q?"}}});
    let backend = backend_for(&serve(recording_backend(seen.clone(), reply)).await);

    let mut f = arrays_form();
    f.api_key = "sk-test".into();
    dispatch(&backend, SENTINEL, Action::Quiz, &f).await.unwrap();
    f.api_key = SENTINEL.into();
    dispatch(&backend, SENTINEL, Action::Quiz, &f).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].1.as_deref(), Some("Bearer sk-test"));
    assert_eq!(seen[1].1, None);
    assert!(seen[1].2.get("apiKey").is_none());
  }

  #[tokio::test]
  async fn validation_submit_hits_validate() {
    let seen: Seen = Arc::default();
    let reply = json!({"success": true, "data": {"isValid": true, "feedback": "ok", "confidenceScore": 0.9}});
    let backend = backend_for(&serve(recording_backend(seen.clone(), reply)).await);

    let mut f = arrays_form();
    f.validation_enabled = true;
    f.same_settings = true;
    let out = dispatch(&backend, SENTINEL, Action::Submit, &f).await.unwrap();
    assert!(matches!(out, Outcome::Validation(v) if v.is_valid));
    assert_eq!(seen.lock().unwrap()[0].0, "/api/validate");
  }

  #[tokio::test]
  async fn validation_override_reaches_backend_top_level() {
    let seen: Seen = Arc::default();
    let reply = json!({"success": true, "data": {"isValid": true, "feedback": "ok", "confidenceScore": 0.9}});
    let backend = backend_for(&serve(recording_backend(seen.clone(), reply)).await);

    let mut f = arrays_form();
    f.api_key = "sk-gen".into();
    f.validation_enabled = true;
    f.validation_override = Some(ValidationOverride { provider: "google".into(), model: "gemini-pro".into(), api_key: "g-key".into() });
    dispatch(&backend, SENTINEL, Action::Submit, &f).await.unwrap();

    let seen = seen.lock().unwrap();
    let (path, auth, body) = &seen[0];
    assert_eq!(path, "/api/validate");
    assert_eq!(auth.as_deref(), Some("Bearer g-key"));
    assert_eq!(body["provider"], "google");
    assert_eq!(body["model"], "gemini-pro");
    assert_eq!(body["apiKey"], "g-key");
  }

  #[tokio::test]
  async fn rate_limit_envelope_becomes_titled_error() {
    let router = Router::new().route(
      "/api/generate",
      post(|| async {
        (StatusCode::TOO_MANY_REQUESTS, Json(json!({"success": false, "error": "slow down please", "error_type": "rate_limit_error"})))
      }),
    );
    let backend = backend_for(&serve(router).await);
    let err = dispatch(&backend, SENTINEL, Action::Submit, &arrays_form()).await.unwrap_err();
    assert_eq!(err.view().title, "Rate Limit Exceeded");
  }

  #[tokio::test]
  async fn setup_error_makes_no_request() {
    let seen: Seen = Arc::default();
    let backend = backend_for(&serve(recording_backend(seen.clone(), json!({}))).await);
    let mut f = arrays_form();
    f.provider.clear();
    assert!(matches!(dispatch(&backend, SENTINEL, Action::Submit, &f).await, Err(UiError::Setup(_))));
    assert!(seen.lock().unwrap().is_empty());
  }
}
