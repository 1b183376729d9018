//! Session orchestration behind the HTTP handlers.
//!
//! Every operation follows the same shape: lock the page, update it and take a
//! ticket; unlock; await the backend; lock again and write the outcome only if
//! the ticket is still the latest for its area. `None` means the answer was
//! superseded and nothing should be swapped.

use maud::{html, Markup};
use tracing::{debug, instrument, warn};

use crate::catalog::{apply_catalog, apply_validation_models, describe, fetch_catalog, fetch_models, pick_model, settle};
use crate::dispatch::{dispatch, quiz_area, Action, Outcome, MODEL_AREA, PROVIDER_AREA, RESULT_AREA, VALIDATION_AREA};
use crate::domain::FormState;
use crate::envkey;
use crate::error::{Result, UiError};
use crate::page::ResultView;
use crate::protocol::FormInput;
use crate::state::AppState;
use crate::util::context_key;
use crate::views;

/// New session plus the full page, with the catalog already loaded.
#[instrument(level = "info", skip(state))]
pub async fn open_page(state: &AppState) -> Result<Markup> {
  let id = state.open_session().await;
  let live = state.live_sessions().await;
  debug!(target: "qgen_ui", session = %id, live, "Opening page");
  let backend = &state.backend;

  let snap = fetch_catalog(backend, None).await;
  let (provider, model) = match &snap {
    Ok(s) => (s.selected.provider.clone(), pick_model(&s.selected.models, "")),
    Err(_) => (String::new(), String::new()),
  };
  let key = envkey::check(backend, &provider).await;
  let description = describe(backend, &provider, &model).await;

  state
    .with_page(&id, |page| {
      settle(page, snap, apply_catalog);
      page.key_input = key;
      page.model_description = description;
      views::full_page(&state.config.title, &id, page, &state.renderer)
    })
    .await
}

/// Provider change: refetch the provider list, then the models. A failed fetch
/// restores the previous selection.
#[instrument(level = "info", skip(state, input), fields(session = %input.session, provider = %input.provider))]
pub async fn change_provider(state: &AppState, input: FormInput) -> Result<Option<Markup>> {
  let form = input.to_state();
  let ticket = state
    .with_page(&input.session, |page| {
      page.tickets.issue(MODEL_AREA);
      page.tickets.issue(PROVIDER_AREA)
    })
    .await?;
  let backend = &state.backend;

  let snap = fetch_catalog(backend, Some(&form.provider)).await;
  let (key, description) = match &snap {
    Ok(s) => {
      let provider = &s.selected.provider;
      let model = pick_model(&s.selected.models, &form.model);
      (envkey::check(backend, provider).await, describe(backend, provider, &model).await)
    }
    Err(_) => (Default::default(), None),
  };

  state
    .with_page(&input.session, |page| {
      if !page.tickets.is_latest(PROVIDER_AREA, ticket) {
        debug!(target: "catalog", session = %input.session, ticket, "Discarding superseded provider change");
        return None;
      }
      let previous = (page.form.provider.clone(), page.form.model.clone());
      page.absorb_form(form);
      match snap {
        Ok(snap) => {
          apply_catalog(page, snap);
          page.key_input = key;
          page.model_description = description;
        }
        Err(e) => {
          warn!(target: "catalog", error = %e, "Catalog fetch failed; keeping previous selection");
          (page.form.provider, page.form.model) = previous;
        }
      }
      Some(views::provider_section(page))
    })
    .await
}

#[instrument(level = "info", skip(state, input), fields(session = %input.session, model = %input.model))]
pub async fn change_model(state: &AppState, input: FormInput) -> Result<Option<Markup>> {
  let form = input.to_state();
  let ticket = state.with_page(&input.session, |page| page.tickets.issue(MODEL_AREA)).await?;
  let description = describe(&state.backend, &form.provider, &form.model).await;
  state
    .with_page(&input.session, |page| {
      if !page.tickets.is_latest(MODEL_AREA, ticket) {
        return None;
      }
      page.absorb_form(form);
      page.model_description = description;
      Some(views::model_field(page))
    })
    .await
}

/// Validation provider change: fill the override model select.
#[instrument(level = "info", skip(state, input), fields(session = %input.session, provider = %input.validation_provider))]
pub async fn change_validation_provider(state: &AppState, input: FormInput) -> Result<Option<Markup>> {
  let form = input.to_state();
  let provider = form.validation_override.as_ref().map(|o| o.provider.clone()).unwrap_or_default();
  let ticket = state.with_page(&input.session, |page| page.tickets.issue(VALIDATION_AREA)).await?;
  let models = fetch_models(&state.backend, &provider).await;

  state
    .with_page(&input.session, |page| {
      if !page.tickets.is_latest(VALIDATION_AREA, ticket) {
        return None;
      }
      page.absorb_form(form);
      settle(page, models, apply_validation_models);
      Some(views::validation_overrides(page, false))
    })
    .await
}

/// Keystroke or checkbox change: controls plus the override sub-form.
#[instrument(level = "debug", skip(state, input), fields(session = %input.session))]
pub async fn update_form(state: &AppState, input: FormInput) -> Result<Markup> {
  let form = input.to_state();
  state
    .with_page(&input.session, |page| {
      page.absorb_form(form);
      views::form_refresh(page)
    })
    .await
}

#[instrument(level = "info", skip(state, input), fields(session = %input.session))]
pub async fn submit(state: &AppState, input: FormInput) -> Result<Option<Markup>> {
  run_submit(state, &input.session, input.to_state(), false).await
}

/// Copy a quiz question into the question field and generate from it.
#[instrument(level = "info", skip(state, input), fields(session = %input.session, quiz_key = %input.quiz_key))]
pub async fn apply_quiz(state: &AppState, input: FormInput) -> Result<Option<Markup>> {
  let mut form = input.to_state();
  let question = state
    .with_page(&input.session, |page| page.quiz(&input.quiz_key).map(|q| q.question.clone()))
    .await?
    .ok_or_else(|| UiError::Setup("That quiz is no longer available. Request a new one.".into()))?;
  form.question_context = question;
  run_submit(state, &input.session, form, true).await
}

async fn run_submit(state: &AppState, session: &str, form: FormState, push_question: bool) -> Result<Option<Markup>> {
  let (form, ticket) = state
    .with_page(session, |page| {
      page.absorb_form(form);
      page.result = ResultView::Loading;
      (page.form.clone(), page.tickets.issue(RESULT_AREA))
    })
    .await?;

  let outcome = dispatch(&state.backend, state.sentinel(), Action::Submit, &form).await;

  state
    .with_page(session, |page| {
      if !page.tickets.is_latest(RESULT_AREA, ticket) {
        debug!(target: "dispatch", %session, ticket, "Discarding superseded result");
        return None;
      }
      page.result = match outcome {
        Ok(Outcome::Generation(g)) => ResultView::Generation(g),
        Ok(Outcome::Validation(v)) => ResultView::Validation(v),
        Ok(Outcome::Quiz(_)) => ResultView::Failed(UiError::ResponseFormat("quiz payload for a submit".into()).view()),
        Err(e) => ResultView::Failed(e.view()),
      };
      let body = views::result_body(&state.renderer, &page.result);
      Some(if push_question {
        html! {
          (body)
          (views::question_field(&page.form, true))
          (views::controls(page.form.controls(), true))
        }
      } else {
        body
      })
    })
    .await
}

/// Quiz cards are keyed by platform|technology|topic; errors go to the result area.
#[instrument(level = "info", skip(state, input), fields(session = %input.session))]
pub async fn request_quiz(state: &AppState, input: FormInput) -> Result<Option<Markup>> {
  let form = input.to_state();
  let key = context_key(&form.platform, &form.technology, &form.topic);
  let area = quiz_area(&key);

  let (form, ticket) = state
    .with_page(&input.session, |page| {
      page.absorb_form(form);
      (page.form.clone(), page.tickets.issue(&area))
    })
    .await?;

  let outcome = dispatch(&state.backend, state.sentinel(), Action::Quiz, &form).await;

  state
    .with_page(&input.session, |page| {
      if !page.tickets.is_latest(&area, ticket) {
        debug!(target: "dispatch", session = %input.session, ticket, %key, "Discarding superseded quiz");
        return None;
      }
      match outcome {
        Ok(Outcome::Quiz(q)) => {
          page.put_quiz(key, q);
          Some(state.renderer.quiz_stack(&page.quizzes))
        }
        other => {
          let err = match other {
            Err(e) => e,
            Ok(_) => UiError::ResponseFormat("non-quiz payload for a quiz".into()),
          };
          page.result = ResultView::Failed(err.view());
          Some(html! {
            (state.renderer.quiz_stack(&page.quizzes))
            (views::result_oob(&state.renderer, &page.result))
          })
        }
      }
    })
    .await
}
