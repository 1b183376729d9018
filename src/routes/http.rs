//! HTTP endpoint handlers. These are thin wrappers that forward to `logic`.
//! Fragment handlers answer 204 when their result was superseded, so htmx
//! leaves the page alone.

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Form, Json};
use maud::Markup;
use tracing::instrument;

use crate::error::Result;
use crate::logic;
use crate::protocol::{FormInput, HealthOut};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

fn fragment(out: Result<Option<Markup>>) -> Response {
  match out {
    Ok(Some(markup)) => markup.into_response(),
    Ok(None) => StatusCode::NO_CONTENT.into_response(),
    Err(e) => e.into_response(),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn ui_index(State(state): State<Arc<AppState>>) -> Result<Markup> {
  logic::open_page(&state).await
}

#[instrument(level = "info", skip(state, input), fields(provider = %input.provider))]
pub async fn ui_provider(State(state): State<Arc<AppState>>, Form(input): Form<FormInput>) -> Response {
  fragment(logic::change_provider(&state, input).await)
}

#[instrument(level = "info", skip(state, input), fields(model = %input.model))]
pub async fn ui_model(State(state): State<Arc<AppState>>, Form(input): Form<FormInput>) -> Response {
  fragment(logic::change_model(&state, input).await)
}

#[instrument(level = "info", skip(state, input), fields(provider = %input.validation_provider))]
pub async fn ui_validation_provider(State(state): State<Arc<AppState>>, Form(input): Form<FormInput>) -> Response {
  fragment(logic::change_validation_provider(&state, input).await)
}

#[instrument(level = "debug", skip(state, input))]
pub async fn ui_form(State(state): State<Arc<AppState>>, Form(input): Form<FormInput>) -> Result<Markup> {
  logic::update_form(&state, input).await
}

#[instrument(level = "info", skip(state, input), fields(topic = %input.topic, validation = input.validation.is_some()))]
pub async fn ui_submit(State(state): State<Arc<AppState>>, Form(input): Form<FormInput>) -> Response {
  fragment(logic::submit(&state, input).await)
}

#[instrument(level = "info", skip(state, input), fields(topic = %input.topic, style = %input.quiz_style))]
pub async fn ui_quiz(State(state): State<Arc<AppState>>, Form(input): Form<FormInput>) -> Response {
  fragment(logic::request_quiz(&state, input).await)
}

#[instrument(level = "info", skip(state, input), fields(quiz_key = %input.quiz_key))]
pub async fn ui_apply_quiz(State(state): State<Arc<AppState>>, Form(input): Form<FormInput>) -> Response {
  fragment(logic::apply_quiz(&state, input).await)
}
