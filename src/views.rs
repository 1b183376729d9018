//! Page templates. The full shell is rendered once per session; every other
//! function renders one fragment that an htmx request swaps in.

use maud::{html, Markup, DOCTYPE};

use crate::domain::{FormState, QuizStyle};
use crate::envkey::KeyInputState;
use crate::form::ControlState;
use crate::page::{Page, ResultView};
use crate::render::{error_block, loading, Renderer};

const HTMX_SRC: &str = "https://unpkg.com/htmx.org@1.9.12";
const HLJS_SRC: &str = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js";
const HLJS_THEME: &str = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/github.min.css";

/// Attributes shared by inputs that re-evaluate the controls.
const FORM_TRIGGER: &str = "input changed delay:150ms";

pub fn full_page(title: &str, session: &str, page: &Page, renderer: &Renderer) -> Markup {
  let form = &page.form;
  html! {
    (DOCTYPE)
    html lang="en" {
      head {
        meta charset="utf-8";
        meta name="viewport" content="width=device-width, initial-scale=1";
        title { (title) }
        link rel="stylesheet" href=(HLJS_THEME);
        link rel="stylesheet" href="/app.css";
        script src=(HTMX_SRC) {}
        script src=(HLJS_SRC) {}
        script src="/app.js" defer {}
      }
      body {
        header { h1 { (title) } }
        main {
          form #question-form hx-post="/ui/submit" hx-target="#result" hx-swap="innerHTML" hx-indicator="#result-loading" {
            input type="hidden" name="session" value=(session);
            (provider_section(page))
            fieldset.context {
              legend { "Question context" }
              (text_field("platform", "Platform", "e.g. iOS", &form.platform))
              (text_field("technology", "Technology", "e.g. Swift", &form.technology))
              (text_field("topic", "Topic", "e.g. Arrays", &form.topic))
              label for="keywords" { "Keywords" }
              input #keywords type="text" name="keywords" placeholder="comma,separated" value=(form.keywords.join(","));
              (question_field(form, false))
            }
            fieldset.validation {
              legend { "Validation" }
              label {
                input type="checkbox" name="validation" checked[form.validation_enabled]
                  hx-post="/ui/form" hx-trigger="change" hx-target="#controls" hx-swap="outerHTML";
                " Validate the generated question"
              }
              label {
                input type="checkbox" name="same_settings" checked[form.same_settings]
                  hx-post="/ui/form" hx-trigger="change" hx-target="#controls" hx-swap="outerHTML";
                " Use same settings as generation"
              }
              (validation_overrides(page, false))
            }
            fieldset.quiz-options {
              legend { "Quiz" }
              label for="quiz_style" { "Style" }
              select #quiz_style name="quiz_style" {
                option value="" selected[form.quiz_style.is_none()] { "Default" }
                @for style in QuizStyle::ALL {
                  option value=(style.as_str()) selected[form.quiz_style == Some(style)] { (style.as_str()) }
                }
              }
            }
            (controls(form.controls(), false))
          }
          section #result-section {
            div #result-loading.htmx-indicator { (loading("Working…")) }
            div #result { (result_body(renderer, &page.result)) }
          }
          section #quiz-section {
            h2 { "Quizzes" }
            div #quiz-loading.htmx-indicator { (loading("Generating quiz…")) }
            div #quiz-area { (renderer.quiz_stack(&page.quizzes)) }
          }
        }
      }
    }
  }
}

fn text_field(name: &str, label: &str, placeholder: &str, value: &str) -> Markup {
  html! {
    label for=(name) { (label) }
    input id=(name) type="text" name=(name) placeholder=(placeholder) value=(value)
      hx-post="/ui/form" hx-trigger=(FORM_TRIGGER) hx-target="#controls" hx-swap="outerHTML";
  }
}

/// Provider select, model select and key input; swapped whole on provider change.
pub fn provider_section(page: &Page) -> Markup {
  html! {
    fieldset #provider-section {
      legend { "Generation settings" }
      label for="provider" { "Provider" }
      select #provider name="provider"
        hx-post="/ui/provider" hx-trigger="change" hx-target="#provider-section" hx-swap="outerHTML" {
        @if page.catalog.providers.is_empty() {
          option value="" disabled selected { "No providers available" }
        }
        @for p in &page.catalog.providers {
          option value=(p) selected[*p == page.form.provider] { (p) }
        }
      }
      (model_field(page))
      (key_input(&page.key_input))
    }
  }
}

pub fn model_field(page: &Page) -> Markup {
  let models = page.models();
  html! {
    div #model-field {
      label for="model" { "Model" }
      select #model name="model" title=[page.model_description.as_deref()]
        hx-post="/ui/model" hx-trigger="change" hx-target="#model-field" hx-swap="outerHTML" {
        @if models.is_empty() {
          option value="" disabled selected { "No models available" }
        }
        @for m in models {
          option value=(m.id) selected[m.id == page.form.model] title=[m.description.as_deref()] { (m.id) }
        }
      }
    }
  }
}

/// The key only appears in the `value` attribute.
pub fn key_input(k: &KeyInputState) -> Markup {
  html! {
    div #key-field {
      label for="api_key" { "API key" }
      input #api_key type="password" name="api_key" autocomplete="off"
        class=[k.env_sourced.then_some("env-key")]
        value=(k.value)
        placeholder=(k.placeholder());
      @if let Some(credit) = &k.credit {
        small.key-credit { (credit) }
      }
    }
  }
}

pub fn question_field(form: &FormState, oob: bool) -> Markup {
  html! {
    div #question-field hx-swap-oob=[oob.then_some("true")] {
      label for="question" { "Question (optional)" }
      textarea #question name="question" rows="4" placeholder="Paste a question to expand or validate"
        hx-post="/ui/form" hx-trigger=(FORM_TRIGGER) hx-target="#controls" hx-swap="outerHTML" {
        (form.question_context)
      }
    }
  }
}

/// Override sub-form; `hidden` unless validation is on without "same settings".
/// The model select lists the chosen validation provider's models.
pub fn validation_overrides(page: &Page, oob: bool) -> Markup {
  let form = &page.form;
  let o = form.validation_override.clone().unwrap_or_default();
  let models = page.models_for(&o.provider);
  html! {
    div #validation-overrides hidden[!form.controls().validation_overrides_visible] hx-swap-oob=[oob.then_some("true")] {
      label for="validation_provider" { "Validation provider" }
      select #validation_provider name="validation_provider"
        hx-post="/ui/validation-provider" hx-trigger="change" hx-target="#validation-overrides" hx-swap="outerHTML" {
        option value="" selected[o.provider.is_empty()] { "Same as generation" }
        @for p in &page.catalog.providers {
          option value=(p) selected[*p == o.provider] { (p) }
        }
      }
      label for="validation_model" { "Validation model" }
      select #validation_model name="validation_model" {
        @if models.is_empty() {
          option value="" selected { "Same as generation" }
        }
        @for m in models {
          option value=(m.id) selected[m.id == o.model] title=[m.description.as_deref()] { (m.id) }
        }
      }
      label for="validation_api_key" { "Validation API key" }
      input #validation_api_key type="password" name="validation_api_key" autocomplete="off"
        value=(o.api_key) placeholder="Leave empty to use the server key";
    }
  }
}

pub fn controls(c: ControlState, oob: bool) -> Markup {
  html! {
    div #controls hx-swap-oob=[oob.then_some("true")] {
      button #submit-btn type="submit" disabled[!c.submit_enabled] { "Generate" }
      button #quiz-btn type="button" disabled[!c.quiz_enabled]
        hx-post="/ui/quiz" hx-include="#question-form" hx-target="#quiz-area" hx-swap="innerHTML" hx-indicator="#quiz-loading" {
        "Quiz me"
      }
    }
  }
}

/// Response to a form change: controls plus the override sub-form out of band.
pub fn form_refresh(page: &Page) -> Markup {
  html! {
    (controls(page.form.controls(), false))
    (validation_overrides(page, true))
  }
}

pub fn result_body(renderer: &Renderer, view: &ResultView) -> Markup {
  match view {
    ResultView::Empty => html! { p.placeholder { "Results will appear here." } },
    ResultView::Loading => loading("Working…"),
    ResultView::Generation(g) => renderer.generation(g),
    ResultView::Validation(v) => renderer.validation(v),
    ResultView::Failed(e) => error_block(e),
  }
}

/// Result area content pushed out of band, for responses targeting elsewhere.
pub fn result_oob(renderer: &Renderer, view: &ResultView) -> Markup {
  html! {
    div #result hx-swap-oob="true" { (result_body(renderer, view)) }
  }
}
