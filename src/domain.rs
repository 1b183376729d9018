//! Domain models used by the UI: form state, provider catalog, and the three
//! result kinds the backend can hand back (generation, validation, quiz).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Difficulty tier of an answer block. Ordering is the display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
  Beginner,
  Intermediate,
  Advanced,
}

impl Tier {
  pub const ALL: [Tier; 3] = [Tier::Beginner, Tier::Intermediate, Tier::Advanced];

  /// Accepts the backend's keys ("beginner") as well as level names ("Beginner").
  pub fn parse(s: &str) -> Option<Tier> {
    match s.trim().to_ascii_lowercase().as_str() {
      "beginner" => Some(Tier::Beginner),
      "intermediate" => Some(Tier::Intermediate),
      "advanced" => Some(Tier::Advanced),
      _ => None,
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      Tier::Beginner => "beginner",
      Tier::Intermediate => "intermediate",
      Tier::Advanced => "advanced",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Tier::Beginner => "Beginner",
      Tier::Intermediate => "Intermediate",
      Tier::Advanced => "Advanced",
    }
  }

  /// Color used to mark the correct test option in this tier's tab.
  pub fn accent(self) -> &'static str {
    match self {
      Tier::Beginner => "#2e7d32",
      Tier::Intermediate => "#1565c0",
      Tier::Advanced => "#6a1b9a",
    }
  }
}

/// Validation settings that differ from the generation settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationOverride {
  pub provider: String,
  pub model: String,
  pub api_key: String,
}

/// Everything the user has typed or selected, rebuilt from the submitted form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormState {
  pub platform: String,
  pub technology: String,
  pub topic: String,
  pub keywords: Vec<String>,
  pub question_context: String,
  pub provider: String,
  pub model: String,
  /// May hold the masked sentinel handed out by the env-key check.
  pub api_key: String,
  pub validation_enabled: bool,
  pub same_settings: bool,
  /// Present only when validation is on and "same settings" is unchecked.
  pub validation_override: Option<ValidationOverride>,
  pub quiz_style: Option<QuizStyle>,
}

/// Style accepted by the user-quiz endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizStyle {
  Expand,
  Pitfall,
  Application,
  Compare,
}

impl QuizStyle {
  pub const ALL: [QuizStyle; 4] = [QuizStyle::Expand, QuizStyle::Pitfall, QuizStyle::Application, QuizStyle::Compare];

  pub fn parse(s: &str) -> Option<QuizStyle> {
    match s.trim().to_ascii_lowercase().as_str() {
      "expand" => Some(QuizStyle::Expand),
      "pitfall" => Some(QuizStyle::Pitfall),
      "application" => Some(QuizStyle::Application),
      "compare" => Some(QuizStyle::Compare),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      QuizStyle::Expand => "Expand",
      QuizStyle::Pitfall => "Pitfall",
      QuizStyle::Application => "Application",
      QuizStyle::Compare => "Compare",
    }
  }
}

/// One selectable model of a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelEntry {
  pub id: String,
  pub description: Option<String>,
}

/// Provider id → models, as last fetched. Holds the generation provider and,
/// when it differs, the validation provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProviderCatalog {
  pub providers: Vec<String>,
  pub models: BTreeMap<String, Vec<ModelEntry>>,
}

/// Multiple-choice test attached to an answer tier.
#[derive(Clone, Debug, PartialEq)]
pub struct TestItem {
  pub snippet: String,
  pub options: Vec<String>,
  /// Zero-based; `None` when the backend gave no usable answer.
  pub correct_index: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnswerLevel {
  pub answer_text: String,
  pub evaluation_criteria: Option<String>,
  pub tests: Vec<TestItem>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct GenerationResult {
  pub question_text: String,
  pub tags: Vec<String>,
  pub answer_levels: BTreeMap<Tier, AnswerLevel>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ValidationResult {
  pub is_valid: bool,
  pub feedback: String,
  /// Always within [0, 1].
  pub confidence_score: f64,
  pub original_question: Option<String>,
  pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct TopicMeta {
  pub platform: String,
  pub technology: String,
  pub name: String,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct QuizResult {
  pub question: String,
  pub topic_meta: Option<TopicMeta>,
  pub tags: Vec<String>,
}
