//! Wire structs for the backend HTTP contract and for the UI's own form posts.
//!
//! Backend responses come from several generations of the question service, so
//! the response DTOs accept every field spelling we have seen and convert into
//! the strict domain types in one place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    AnswerLevel, GenerationResult, ModelEntry, QuizResult, TestItem, Tier, TopicMeta, ValidationResult,
};

//
// Envelope shared by every backend endpoint
//

/// `{success, data, error, error_type}`; `data` is decoded per endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: Option<bool>,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub error_type: Option<String>,
    pub details: Option<Value>,
}

impl Envelope {
    /// An envelope is a failure when it says so, or carries an error without data.
    pub fn is_failure(&self) -> bool {
        self.success == Some(false) || (self.error.is_some() && self.data.is_none())
    }
}

//
// Catalog endpoints
//

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NameWire {
    Name(String),
    Entry {
        #[serde(alias = "id", alias = "provider")]
        name: String,
    },
}

impl NameWire {
    pub fn into_name(self) -> String {
        match self {
            NameWire::Name(n) | NameWire::Entry { name: n } => n,
        }
    }
}

/// `{success, providers: [..]}` or `{success, agents: [..]}`.
#[derive(Debug, Deserialize)]
pub struct ProvidersOut {
    pub providers: Option<Vec<NameWire>>,
    pub agents: Option<Vec<NameWire>>,
}

impl ProvidersOut {
    pub fn into_list(self) -> Vec<String> {
        self.providers
            .or(self.agents)
            .unwrap_or_default()
            .into_iter()
            .map(NameWire::into_name)
            .filter(|p| !p.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ModelWire {
    Name(String),
    Entry {
        #[serde(alias = "id")]
        model: String,
        #[serde(default)]
        description: Option<String>,
    },
}

/// `{models: [..]}`, or a bare list from older backends.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ModelsOut {
    Wrapped { models: Vec<ModelWire> },
    Bare(Vec<ModelWire>),
}

impl ModelsOut {
    pub fn into_entries(self) -> Vec<ModelEntry> {
        let list = match self {
            ModelsOut::Wrapped { models } => models,
            ModelsOut::Bare(models) => models,
        };
        list.into_iter()
            .map(|m| match m {
                ModelWire::Name(id) => ModelEntry { id, description: None },
                ModelWire::Entry { model, description } => ModelEntry {
                    id: model,
                    description: description.filter(|d| !d.trim().is_empty()),
                },
            })
            .filter(|m| !m.id.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct DescriptionOut {
    pub description: Option<String>,
}

/// `api_key` is a dev-only echo of the server key (or the masked sentinel).
#[derive(Deserialize)]
pub struct EnvKeyOut {
    #[serde(default)]
    pub exists: bool,
    pub api_key: Option<String>,
    pub credit: Option<String>,
}

impl std::fmt::Debug for EnvKeyOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvKeyOut")
            .field("exists", &self.exists)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("credit", &self.credit)
            .finish()
    }
}

//
// Requests
//

#[derive(Debug, Serialize)]
pub struct GenerateIn<'a> {
    pub topic: &'a str,
    pub platform: &'a str,
    pub tech: &'a str,
    pub keywords: &'a [String],
    pub provider: &'a str,
    pub model: &'a str,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<&'a str>,
    pub validation: bool,
    pub question: &'a str,
    #[serde(rename = "validationProvider", skip_serializing_if = "Option::is_none")]
    pub validation_provider: Option<&'a str>,
    #[serde(rename = "validationModel", skip_serializing_if = "Option::is_none")]
    pub validation_model: Option<&'a str>,
    #[serde(rename = "validationApiKey", skip_serializing_if = "Option::is_none")]
    pub validation_api_key: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct QuizContext<'a> {
    pub platform: &'a str,
    pub technology: &'a str,
    pub topic: &'a str,
    pub tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct QuizIn<'a> {
    pub provider: &'a str,
    pub model: &'a str,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<&'a str>,
    pub context: QuizContext<'a>,
}

//
// Generation result
//

/// Option index given as a number or as text such as "2", "2." or "Option 2".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexWire(pub Option<u64>);

impl<'de> Deserialize<'de> for IndexWire {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct Vis;
        impl<'de> serde::de::Visitor<'de> for Vis {
            type Value = IndexWire;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("option index as number or string")
            }
            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<IndexWire, E> {
                Ok(IndexWire(Some(v)))
            }
            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<IndexWire, E> {
                Ok(IndexWire(u64::try_from(v).ok()))
            }
            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<IndexWire, E> {
                Ok(IndexWire(if v >= 0.0 && v.fract() == 0.0 { Some(v as u64) } else { None }))
            }
            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<IndexWire, E> {
                let digits: String = v
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit())
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                Ok(IndexWire(digits.parse().ok()))
            }
            fn visit_unit<E: serde::de::Error>(self) -> Result<IndexWire, E> {
                Ok(IndexWire(None))
            }
        }
        d.deserialize_any(Vis)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestWire {
    #[serde(default, alias = "code", alias = "question")]
    pub snippet: String,
    #[serde(default, alias = "choices")]
    pub options: Vec<String>,
    /// Zero-based.
    #[serde(default, alias = "correct", alias = "correct_index")]
    pub correct_index: Option<IndexWire>,
    /// One-based option number.
    #[serde(default)]
    pub answer: Option<IndexWire>,
}

impl TestWire {
    fn into_item(self) -> TestItem {
        let zero_based = match (self.correct_index.and_then(|i| i.0), self.answer.and_then(|a| a.0)) {
            (Some(i), _) => Some(i),
            (None, Some(n)) if n >= 1 => Some(n - 1),
            _ => None,
        };
        let correct_index = zero_based
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < self.options.len());
        TestItem { snippet: self.snippet, options: self.options, correct_index }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelWire {
    #[serde(default, alias = "answerText", alias = "text")]
    pub answer: String,
    #[serde(default, alias = "evaluation_criteria")]
    pub evaluation_criteria: Option<String>,
    #[serde(default)]
    pub tests: Vec<TestWire>,
    /// Older backends put a single choice list on the level itself.
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub correct: Option<IndexWire>,
}

impl LevelWire {
    fn into_level(self) -> AnswerLevel {
        let mut tests: Vec<TestItem> = self.tests.into_iter().map(TestWire::into_item).collect();
        if tests.is_empty() && !self.choices.is_empty() {
            tests.push(
                TestWire { snippet: String::new(), options: self.choices, correct_index: self.correct, answer: None }
                    .into_item(),
            );
        }
        AnswerLevel {
            answer_text: self.answer,
            evaluation_criteria: self.evaluation_criteria.filter(|c| !c.trim().is_empty()),
            tests,
        }
    }
}

fn levels_from_wire(wire: BTreeMap<String, LevelWire>) -> BTreeMap<Tier, AnswerLevel> {
    wire.into_iter()
        .filter_map(|(k, v)| Tier::parse(&k).map(|t| (t, v.into_level())))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionModelWire {
    #[serde(alias = "question", alias = "questionText")]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "answers", alias = "answer_levels")]
    pub answer_levels: BTreeMap<String, LevelWire>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuestionWire {
    Text(String),
    Model(QuestionModelWire),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationData {
    #[serde(alias = "questionText", alias = "text")]
    pub question: QuestionWire,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "answers", alias = "answer_levels")]
    pub answer_levels: BTreeMap<String, LevelWire>,
}

impl GenerationData {
    pub fn into_result(self) -> GenerationResult {
        match self.question {
            QuestionWire::Text(text) => GenerationResult {
                question_text: text,
                tags: self.tags,
                answer_levels: levels_from_wire(self.answer_levels),
            },
            QuestionWire::Model(q) => {
                let levels = if q.answer_levels.is_empty() { self.answer_levels } else { q.answer_levels };
                GenerationResult {
                    question_text: q.text,
                    tags: if q.tags.is_empty() { self.tags } else { q.tags },
                    answer_levels: levels_from_wire(levels),
                }
            }
        }
    }
}

//
// Validation result
//

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationData {
    #[serde(default, alias = "is_valid", alias = "passed", alias = "valid")]
    pub is_valid: Option<bool>,
    #[serde(default, alias = "details", alias = "comments")]
    pub feedback: Option<String>,
    #[serde(default, alias = "confidence", alias = "score", alias = "confidence_score")]
    pub confidence_score: Option<f64>,
    /// 1–10 rating from the structured validator.
    #[serde(default, alias = "quality_score")]
    pub quality_score: Option<f64>,
    #[serde(default, alias = "original_question")]
    pub original_question: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Either a nested validation object or a bare verdict string ("ok").
    #[serde(default)]
    pub validation: Option<Value>,
}

impl ValidationData {
    pub fn into_result(self) -> ValidationResult {
        let mut outer = self;
        let verdict_text = match outer.validation.take() {
            Some(Value::Object(map)) => {
                if let Ok(inner) = serde_json::from_value::<ValidationData>(Value::Object(map)) {
                    outer.is_valid = inner.is_valid.or(outer.is_valid);
                    outer.feedback = inner.feedback.or(outer.feedback);
                    outer.confidence_score = inner.confidence_score.or(outer.confidence_score);
                    outer.quality_score = inner.quality_score.or(outer.quality_score);
                    outer.original_question = inner.original_question.or(outer.original_question);
                    if !inner.recommendations.is_empty() {
                        outer.recommendations = inner.recommendations;
                    }
                }
                None
            }
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        let is_valid = outer.is_valid.unwrap_or_else(|| {
            matches!(verdict_text.as_deref().map(str::to_ascii_lowercase).as_deref(), Some("ok" | "valid" | "passed"))
        });
        let confidence = outer
            .confidence_score
            .or(outer.quality_score.map(|q| q / 10.0))
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);

        ValidationResult {
            is_valid,
            feedback: outer.feedback.unwrap_or_default(),
            confidence_score: confidence,
            original_question: outer.original_question.filter(|q| !q.trim().is_empty()),
            recommendations: outer.recommendations,
        }
    }
}

//
// Quiz result
//

#[derive(Debug, Deserialize)]
pub struct TopicWire {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub technology: Option<String>,
    #[serde(default, alias = "topic")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct QuizWire {
    pub question: String,
    #[serde(default)]
    pub topic: Option<TopicWire>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuizData {
    Nested { quiz: QuizWire },
    Flat(QuizWire),
}

impl QuizData {
    pub fn into_result(self) -> QuizResult {
        let (QuizData::Nested { quiz } | QuizData::Flat(quiz)) = self;
        QuizResult {
            question: quiz.question,
            topic_meta: quiz.topic.map(|t| TopicMeta {
                platform: t.platform,
                technology: t.technology.unwrap_or_default(),
                name: t.name,
            }),
            tags: quiz.tags,
        }
    }
}

//
// UI form posts (htmx, urlencoded)
//

/// Raw form fields as the browser posts them. Checkboxes arrive as "on" or not at all.
#[derive(Debug, Default, Deserialize)]
pub struct FormInput {
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub technology: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub validation: Option<String>,
    #[serde(default)]
    pub same_settings: Option<String>,
    #[serde(default)]
    pub validation_provider: String,
    #[serde(default)]
    pub validation_model: String,
    #[serde(default)]
    pub validation_api_key: String,
    #[serde(default)]
    pub quiz_style: String,
    /// Set by the quiz card's "Apply" button.
    #[serde(default)]
    pub quiz_key: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generation(v: Value) -> GenerationResult {
        serde_json::from_value::<GenerationData>(v).unwrap().into_result()
    }

    #[test]
    fn flat_generation_payload() {
        let r = generation(json!({
            "question": "What is ARC?",
            "tags": ["memory"],
            "answerLevels": {
                "beginner": {
                    "answer": "Reference counting.",
                    "evaluationCriteria": "Mentions retain counts",
                    "tests": [{"snippet": "let a = A()", "options": ["1", "2", "3"], "correctIndex": 1}]
                }
            }
        }));
        assert_eq!(r.question_text, "What is ARC?");
        assert_eq!(r.tags, vec!["memory".to_string()]);
        let b = &r.answer_levels[&Tier::Beginner];
        assert_eq!(b.evaluation_criteria.as_deref(), Some("Mentions retain counts"));
        assert_eq!(b.tests[0].correct_index, Some(1));
        assert_eq!(r.answer_levels.len(), 1);
    }

    #[test]
    fn nested_question_model_with_one_based_answers() {
        let r = generation(json!({
            "question": {
                "text": "Explain optionals",
                "tags": ["swift"],
                "answerLevels": {
                    "Advanced": {
                        "answer": "Enum with two cases",
                        "tests": [{"snippet": "```swift\nlet x: Int? = nil\n```", "options": ["1. a", "2. b", "3. c"], "answer": "3"}]
                    }
                }
            }
        }));
        assert_eq!(r.question_text, "Explain optionals");
        assert_eq!(r.answer_levels[&Tier::Advanced].tests[0].correct_index, Some(2));
    }

    #[test]
    fn level_level_choices_become_a_single_test() {
        let r = generation(json!({
            "question": "closures",
            "answers": {
                "beginner": {"text": "A block", "choices": ["A", "B", "C"], "correct": 2},
                "advanced": {"text": "Captures", "choices": [], "correct": null}
            }
        }));
        let b = &r.answer_levels[&Tier::Beginner];
        assert_eq!(b.answer_text, "A block");
        assert_eq!(b.tests.len(), 1);
        assert_eq!(b.tests[0].correct_index, Some(2));
        assert!(r.answer_levels[&Tier::Advanced].tests.is_empty());
    }

    #[test]
    fn out_of_range_correct_index_is_dropped() {
        let t: TestWire = serde_json::from_value(json!({"snippet": "", "options": ["a"], "correctIndex": 4})).unwrap();
        assert_eq!(t.into_item().correct_index, None);
    }

    #[test]
    fn index_wire_reads_digits_inside_text() {
        let i: IndexWire = serde_json::from_value(json!("Option 2.")).unwrap();
        assert_eq!(i, IndexWire(Some(2)));
        let n: IndexWire = serde_json::from_value(json!("B")).unwrap();
        assert_eq!(n, IndexWire(None));
    }

    #[test]
    fn validation_aliases_and_clamping() {
        let v: ValidationData = serde_json::from_value(json!({"validation": "ok", "score": 0.95, "details": "Fine."})).unwrap();
        let r = v.into_result();
        assert!(r.is_valid);
        assert_eq!(r.feedback, "Fine.");
        assert!((r.confidence_score - 0.95).abs() < 1e-9);

        let v: ValidationData = serde_json::from_value(json!({"isValid": false, "confidenceScore": 3.0})).unwrap();
        assert_eq!(v.into_result().confidence_score, 1.0);
    }

    #[test]
    fn nested_structured_validation_uses_quality_score() {
        let v: ValidationData = serde_json::from_value(json!({
            "agent": {"model": {"provider": "openai", "model": "gpt-4o"}},
            "validation": {"passed": true, "quality_score": 8, "comments": "Solid", "recommendations": ["Add a test"]}
        }))
        .unwrap();
        let r = v.into_result();
        assert!(r.is_valid);
        assert_eq!(r.feedback, "Solid");
        assert!((r.confidence_score - 0.8).abs() < 1e-9);
        assert_eq!(r.recommendations, vec!["Add a test".to_string()]);
    }

    #[test]
    fn quiz_nested_and_flat() {
        let q: QuizData = serde_json::from_value(json!({
            "quiz": {"question": "Reverse a string", "topic": {"platform": "iOS", "technology": "Swift", "topic": "Strings"}}
        }))
        .unwrap();
        let r = q.into_result();
        assert_eq!(r.question, "Reverse a string");
        assert_eq!(r.topic_meta.unwrap().name, "Strings");

        let q: QuizData = serde_json::from_value(json!({"question": "Flat"})).unwrap();
        assert_eq!(q.into_result().question, "Flat");
    }

    #[test]
    fn models_accept_strings_ids_and_bare_lists() {
        let m: ModelsOut = serde_json::from_value(json!({"models": ["gpt-4", {"id": "gpt-4o"}, {"model": "o1", "description": "reasoning"}]})).unwrap();
        let ids: Vec<String> = m.into_entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["gpt-4", "gpt-4o", "o1"]);

        let m: ModelsOut = serde_json::from_value(json!(["gemini-pro"])).unwrap();
        assert_eq!(m.into_entries()[0].id, "gemini-pro");
    }

    #[test]
    fn providers_or_agents_key() {
        let p: ProvidersOut = serde_json::from_value(json!({"success": true, "agents": ["openai", "google"]})).unwrap();
        assert_eq!(p.into_list(), vec!["openai", "google"]);
    }

    #[test]
    fn env_key_debug_redacts_secret() {
        let e: EnvKeyOut = serde_json::from_value(json!({"exists": true, "api_key": "sk-live-123"})).unwrap();
        assert!(!format!("{:?}", e).contains("sk-live-123"));
    }

    #[test]
    fn quiz_request_omits_missing_key_and_question() {
        let tags = vec!["swift".to_string()];
        let body = QuizIn {
            provider: "openai",
            model: "gpt-4",
            api_key: None,
            context: QuizContext { platform: "iOS", technology: "Swift", topic: "Arrays", tags: &tags, question: None, style: None },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert!(v.get("apiKey").is_none());
        assert!(v["context"].get("question").is_none());
        assert_eq!(v["context"]["tags"], json!(["swift"]));
    }
}
