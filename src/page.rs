//! Per-session page model: everything the browser shows, held server-side.
//!
//! Handlers mutate a `Page`; the view functions read it. Nothing here touches
//! the network.

use crate::dispatch::Sequencer;
use crate::domain::{FormState, GenerationResult, ModelEntry, ProviderCatalog, QuizResult, ValidationResult};
use crate::envkey::KeyInputState;
use crate::error::ErrorView;

/// What the result area currently shows. Exactly one at a time.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResultView {
  #[default]
  Empty,
  Loading,
  Generation(GenerationResult),
  Validation(ValidationResult),
  Failed(ErrorView),
}

#[derive(Debug, Default)]
pub struct Page {
  /// Also holds the provider/model selection.
  pub form: FormState,
  pub catalog: ProviderCatalog,
  /// Tooltip for the selected model.
  pub model_description: Option<String>,
  pub key_input: KeyInputState,
  pub result: ResultView,
  /// Quiz cards in first-seen order, keyed by context key.
  pub quizzes: Vec<(String, QuizResult)>,
  pub tickets: Sequencer,
}

impl Page {
  /// Replace the card for `key` in place, or append a new one.
  pub fn put_quiz(&mut self, key: String, quiz: QuizResult) {
    match self.quizzes.iter_mut().find(|(k, _)| *k == key) {
      Some(slot) => slot.1 = quiz,
      None => self.quizzes.push((key, quiz)),
    }
  }

  pub fn quiz(&self, key: &str) -> Option<&QuizResult> {
    self.quizzes.iter().find(|(k, _)| k == key).map(|(_, q)| q)
  }

  /// Models of the selected provider.
  pub fn models(&self) -> &[ModelEntry] {
    self.models_for(&self.form.provider)
  }

  pub fn models_for(&self, provider: &str) -> &[ModelEntry] {
    self.catalog.models.get(provider).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Take the submitted form, keeping the server-side selection when the post
  /// left it blank.
  pub fn absorb_form(&mut self, mut next: FormState) {
    if next.provider.is_empty() {
      next.provider = std::mem::take(&mut self.form.provider);
    }
    if next.model.is_empty() {
      next.model = std::mem::take(&mut self.form.model);
    }
    self.form = next;
  }
}
