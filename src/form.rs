//! Form state controller: builds `FormState` from posted fields and derives
//! which controls are enabled or visible.

use crate::domain::{FormState, QuizStyle, ValidationOverride};
use crate::protocol::FormInput;

/// Derived UI state for the action buttons and the validation sub-form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlState {
  pub submit_enabled: bool,
  pub quiz_enabled: bool,
  pub validation_overrides_visible: bool,
}

/// Comma-separated keywords → trimmed, non-empty list.
pub fn parse_keywords(raw: &str) -> Vec<String> {
  raw.split(',').map(str::trim).filter(|k| !k.is_empty()).map(str::to_string).collect()
}

fn checked(v: &Option<String>) -> bool {
  matches!(v.as_deref().map(str::trim), Some(s) if !s.is_empty() && s != "off" && s != "false")
}

/// A key counts only when it is non-empty and not the masked sentinel.
pub fn is_real_key(key: &str, sentinel: &str) -> bool {
  let k = key.trim();
  !k.is_empty() && k != sentinel
}

impl FormInput {
  pub fn to_state(&self) -> FormState {
    let validation_enabled = checked(&self.validation);
    let same_settings = checked(&self.same_settings);
    let validation_override = if validation_enabled && !same_settings {
      Some(ValidationOverride {
        provider: self.validation_provider.trim().to_string(),
        model: self.validation_model.trim().to_string(),
        api_key: self.validation_api_key.trim().to_string(),
      })
    } else {
      None
    };

    FormState {
      platform: self.platform.trim().to_string(),
      technology: self.technology.trim().to_string(),
      topic: self.topic.trim().to_string(),
      keywords: parse_keywords(&self.keywords),
      question_context: self.question.trim().to_string(),
      provider: self.provider.trim().to_string(),
      model: self.model.trim().to_string(),
      api_key: self.api_key.trim().to_string(),
      validation_enabled,
      same_settings,
      validation_override,
      quiz_style: QuizStyle::parse(&self.quiz_style),
    }
  }
}

impl FormState {
  /// (topic AND platform) OR question context.
  pub fn can_submit(&self) -> bool {
    let structured = !self.topic.trim().is_empty() && !self.platform.trim().is_empty();
    structured || !self.question_context.trim().is_empty()
  }

  pub fn shows_validation_overrides(&self) -> bool {
    self.validation_enabled && !self.same_settings
  }

  pub fn controls(&self) -> ControlState {
    let enabled = self.can_submit();
    ControlState {
      submit_enabled: enabled,
      quiz_enabled: enabled,
      validation_overrides_visible: self.shows_validation_overrides(),
    }
  }

  /// Validation target: the override when present, else the generation settings.
  pub fn validation_target(&self) -> (&str, &str) {
    match &self.validation_override {
      Some(o) if !o.provider.is_empty() && !o.model.is_empty() => (o.provider.as_str(), o.model.as_str()),
      _ => (self.provider.as_str(), self.model.as_str()),
    }
  }
}
