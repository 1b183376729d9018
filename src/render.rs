//! Result renderer: pure functions from backend results to HTML fragments.
//!
//! Each render builds a small view (text split into plain runs and code
//! blocks), runs the highlight adapter over the new blocks, then emits markup.
//! Rendering the same result twice yields the same bytes.

use maud::{html, Markup, PreEscaped};

use crate::domain::{GenerationResult, QuizResult, Tier, ValidationResult};
use crate::error::ErrorView;
use crate::highlight::{CodeBlock, HighlightAdapter};
use crate::markup::{split_fences, Segment};
use crate::util::dom_id;

enum Part {
  Text(String),
  Code(CodeBlock),
}

/// Backend text with fenced code pulled out into highlightable blocks.
pub struct RichText {
  parts: Vec<Part>,
}

impl RichText {
  pub fn parse(text: &str) -> Self {
    let parts = split_fences(text)
      .into_iter()
      .map(|seg| match seg {
        Segment::Text(t) => Part::Text(t.to_string()),
        Segment::Code { lang, body } => Part::Code(CodeBlock::new(lang, body)),
      })
      .collect();
    Self { parts }
  }

  pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut CodeBlock> {
    self.parts.iter_mut().filter_map(|p| match p {
      Part::Code(b) => Some(b),
      Part::Text(_) => None,
    })
  }

  pub fn to_markup(&self) -> Markup {
    html! {
      @for part in &self.parts {
        @match part {
          Part::Text(t) => { (text_with_breaks(t)) }
          Part::Code(b) => { (code_block(b)) }
        }
      }
    }
  }
}

/// Escaped text with every newline turned into `<br>`.
fn text_with_breaks(s: &str) -> Markup {
  html! {
    @for (i, line) in s.split('\n').enumerate() {
      @if i > 0 { br; }
      (line.trim_end_matches('\r'))
    }
  }
}

fn code_block(b: &CodeBlock) -> Markup {
  html! {
    pre {
      code class=(b.class_attr()) data-hl=[b.mark.attr()] {
        @if let Some(h) = &b.html { (PreEscaped(h)) } @else { (b.source) }
      }
    }
  }
}

struct TestView {
  snippet: RichText,
  options: Vec<String>,
  correct: Option<usize>,
}

struct TierTab {
  tier: Tier,
  criteria: Option<RichText>,
  answer: RichText,
  tests: Vec<TestView>,
}

/// "87.5%" for 0.875.
pub fn confidence_percent(score: f64) -> String {
  format!("{:.1}%", score.clamp(0.0, 1.0) * 100.0)
}

#[derive(Clone, Default)]
pub struct Renderer {
  adapter: HighlightAdapter,
}

impl Renderer {
  pub fn new(adapter: HighlightAdapter) -> Self {
    Self { adapter }
  }

  pub fn generation(&self, r: &GenerationResult) -> Markup {
    let mut question = RichText::parse(&r.question_text);
    let mut tabs: Vec<TierTab> = Tier::ALL
      .iter()
      .filter_map(|tier| r.answer_levels.get(tier).map(|level| (*tier, level)))
      .map(|(tier, level)| TierTab {
        tier,
        criteria: level.evaluation_criteria.as_deref().map(RichText::parse),
        answer: RichText::parse(&level.answer_text),
        tests: level
          .tests
          .iter()
          .map(|t| TestView { snippet: RichText::parse(&t.snippet), options: t.options.clone(), correct: t.correct_index })
          .collect(),
      })
      .collect();

    let mut blocks: Vec<&mut CodeBlock> = question.blocks_mut().collect();
    for tab in tabs.iter_mut() {
      if let Some(c) = tab.criteria.as_mut() {
        blocks.extend(c.blocks_mut());
      }
      blocks.extend(tab.answer.blocks_mut());
      for t in tab.tests.iter_mut() {
        blocks.extend(t.snippet.blocks_mut());
      }
    }
    self.adapter.apply(blocks);

    html! {
      div.result.generation {
        section.question {
          h3 { "Question" }
          div.question-text { (question.to_markup()) }
          @if !r.tags.is_empty() {
            div.tags {
              @for tag in &r.tags { span.badge.tag { (tag) } }
            }
          }
        }
        @if !tabs.is_empty() {
          div.tier-tabs {
            @for (i, tab) in tabs.iter().enumerate() {
              input.tab-toggle type="radio" name="tier-tab" id=(format!("tab-{}", tab.tier.key())) checked[i == 0];
              label.tab-label for=(format!("tab-{}", tab.tier.key())) style=(format!("--tier-accent: {}", tab.tier.accent())) {
                (tab.tier.label())
              }
            }
            @for tab in &tabs {
              (tier_panel(tab))
            }
          }
        }
      }
    }
  }

  pub fn validation(&self, v: &ValidationResult) -> Markup {
    let mut feedback = RichText::parse(&v.feedback);
    let mut original = v.original_question.as_deref().map(RichText::parse);
    let mut blocks: Vec<&mut CodeBlock> = feedback.blocks_mut().collect();
    if let Some(o) = original.as_mut() {
      blocks.extend(o.blocks_mut());
    }
    self.adapter.apply(blocks);

    let (banner_class, banner_text) = if v.is_valid {
      ("validation-banner pass", "Validation Passed")
    } else {
      ("validation-banner fail", "Validation Failed")
    };

    html! {
      div.result.validation {
        div class=(banner_class) role="status" { (banner_text) }
        div.feedback { (feedback.to_markup()) }
        p.confidence { "Confidence: " strong { (confidence_percent(v.confidence_score)) } }
        @if !v.recommendations.is_empty() {
          ul.recommendations {
            @for rec in &v.recommendations { li { (rec) } }
          }
        }
        @if let Some(o) = &original {
          details.original-question {
            summary { "Original question" }
            div { (o.to_markup()) }
          }
        }
      }
    }
  }

  pub fn quiz_card(&self, key: &str, q: &QuizResult) -> Markup {
    let mut question = RichText::parse(&q.question);
    self.adapter.apply(question.blocks_mut());
    let vals = serde_json::json!({ "quiz_key": key }).to_string();

    html! {
      article.quiz-card id=(format!("quiz-{}", dom_id(key))) data-quiz-key=(key) {
        @if let Some(meta) = &q.topic_meta {
          p.quiz-meta {
            @for part in [&meta.platform, &meta.technology, &meta.name] {
              @if !part.is_empty() { span.badge { (part) } " " }
            }
          }
        }
        div.quiz-question { (question.to_markup()) }
        @if !q.tags.is_empty() {
          div.tags {
            @for tag in &q.tags { span.badge.tag { (tag) } }
          }
        }
        button.apply-quiz type="button"
          hx-post="/ui/quiz/apply"
          hx-include="#question-form"
          hx-vals=(vals)
          hx-target="#result"
          hx-swap="innerHTML"
          hx-indicator="#result-loading" {
          "Apply"
        }
      }
    }
  }

  /// Whole quiz area; cards in insertion order.
  pub fn quiz_stack(&self, quizzes: &[(String, QuizResult)]) -> Markup {
    html! {
      @for (key, q) in quizzes {
        (self.quiz_card(key, q))
      }
    }
  }
}

fn tier_panel(tab: &TierTab) -> Markup {
  let accent = tab.tier.accent();
  html! {
    div.tab-panel id=(format!("panel-{}", tab.tier.key())) data-tier=(tab.tier.key()) {
      @if let Some(c) = &tab.criteria {
        div.criteria {
          h4 { "Evaluation Criteria" }
          (c.to_markup())
        }
      }
      div.answer {
        h4 { "Answer" }
        (tab.answer.to_markup())
      }
      @if !tab.tests.is_empty() {
        div.tests {
          h4 { "Tests" }
          @for (n, t) in tab.tests.iter().enumerate() {
            div.test-block data-test=(n + 1) {
              div.test-snippet { (t.snippet.to_markup()) }
              ol.test-options {
                @for (j, opt) in t.options.iter().enumerate() {
                  @if t.correct == Some(j) {
                    li.option.correct style=(format!("color: {accent}; border-color: {accent}; font-weight: 600")) { (opt) }
                  } @else {
                    li.option { (opt) }
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}

pub fn error_block(view: &ErrorView) -> Markup {
  html! {
    div.error-block role="alert" {
      h3.error-title { (view.title) }
      p.error-explanation { (view.explanation) }
      @if let Some(d) = &view.details {
        pre.error-details { (d) }
      }
    }
  }
}

pub fn loading(label: &str) -> Markup {
  html! {
    div.loading aria-busy="true" {
      span.spinner {}
      " " (label)
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use std::sync::atomic::Ordering;
  use std::sync::Arc;

  use super::*;
  use crate::domain::{AnswerLevel, TestItem, TopicMeta};
  use crate::error::{BackendErrorKind, UiError};
  use crate::highlight::tests::CountingHighlighter;
  use crate::highlight::Highlighter;

  fn level(answer: &str) -> AnswerLevel {
    AnswerLevel {
      answer_text: answer.into(),
      evaluation_criteria: Some("Knows the basics".into()),
      tests: vec![TestItem {
        snippet: "What does this print?\n```swift\nprint(\"hi\")\n```".into(),
        options: vec!["hi".into(), "nothing".into(), "error".into()],
        correct_index: Some(0),
      }],
    }
  }

  fn sample() -> GenerationResult {
    let mut levels = BTreeMap::new();
    levels.insert(Tier::Advanced, level("Advanced answer"));
    levels.insert(Tier::Beginner, level("Line one\nLine two"));
    GenerationResult {
      question_text: "Explain arrays.\n```swift\nvar a = [1, 2]\n```".into(),
      tags: vec!["arrays".into(), "swift".into()],
      answer_levels: levels,
    }
  }

  #[test]
  fn rendering_twice_is_byte_identical() {
    let r = Renderer::default();
    let result = sample();
    assert_eq!(r.generation(&result).into_string(), r.generation(&result).into_string());
  }

  #[test]
  fn tabs_follow_tier_order_and_skip_absent_tiers() {
    let html = Renderer::default().generation(&sample()).into_string();
    assert_eq!(html.matches("class=\"tab-label\"").count(), 2);
    assert!(!html.contains(">Intermediate<"));
    let b = html.find(">Beginner<").unwrap();
    let a = html.find(">Advanced<").unwrap();
    assert!(b < a);
    // First tab is the selected one.
    assert!(html.contains("id=\"tab-beginner\" checked"));
  }

  #[test]
  fn correct_option_uses_tier_color() {
    let html = Renderer::default().generation(&sample()).into_string();
    assert!(html.contains(&format!("color: {}", Tier::Beginner.accent())));
    assert!(html.contains(&format!("color: {}", Tier::Advanced.accent())));
    assert_eq!(html.matches("class=\"option correct\"").count(), 2);
  }

  #[test]
  fn newlines_outside_fences_become_breaks() {
    let html = Renderer::default().generation(&sample()).into_string();
    assert!(html.contains("Line one<br>Line two"));
    // Inside a fence the newline is preserved.
    assert!(!html.contains("print(&quot;hi&quot;)<br>"));
  }

  #[test]
  fn highlighter_runs_once_per_rendered_block() {
    let counter = Arc::new(CountingHighlighter::default());
    let r = Renderer::new(HighlightAdapter::new(counter.clone()));
    let html = r.generation(&sample()).into_string();
    // question + one snippet per tier
    assert_eq!(counter.calls.load(Ordering::SeqCst), 3);
    assert_eq!(html.matches("data-hl=\"done\"").count(), 3);
    assert!(html.contains("class=\"language-swift\""));
  }

  #[test]
  fn unterminated_fence_renders_as_text() {
    let result = GenerationResult { question_text: "Look:\n```swift\nlet a = 1".into(), ..Default::default() };
    let html = Renderer::default().generation(&result).into_string();
    assert!(!html.contains("<pre>"));
    assert!(html.contains("```swift<br>let a = 1"));
  }

  #[test]
  fn untagged_and_unknown_fences() {
    let result = GenerationResult { question_text: "```\nplain\n```\n```Elixir\nIO.puts 1\n```".into(), ..Default::default() };
    let html = Renderer::default().generation(&result).into_string();
    assert!(html.contains("class=\"language-plaintext hljs\""));
    assert!(html.contains("class=\"language-elixir hljs\""));
  }

  #[test]
  fn backend_text_is_escaped() {
    let result = GenerationResult { question_text: "<script>alert(1)</script>".into(), ..Default::default() };
    let html = Renderer::default().generation(&result).into_string();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
  }

  #[test]
  fn server_side_highlight_markup_is_used() {
    struct Bold;
    impl Highlighter for Bold {
      fn highlight(&self, block: &mut CodeBlock) {
        block.html = Some(format!("<b>{}</b>", block.source));
      }
    }
    let r = Renderer::new(HighlightAdapter::new(Arc::new(Bold)));
    let html = r.generation(&GenerationResult { question_text: "```go\nx\n```".into(), ..Default::default() }).into_string();
    assert!(html.contains("<b>x</b>"));
  }

  #[test]
  fn validation_banner_and_percentage() {
    let v = ValidationResult {
      is_valid: true,
      feedback: "Clear question.".into(),
      confidence_score: 0.875,
      original_question: None,
      recommendations: vec!["Add a snippet".into()],
    };
    let html = Renderer::default().validation(&v).into_string();
    assert!(html.contains("Validation Passed"));
    assert!(html.contains("<strong>87.5%</strong>"));
    assert!(html.contains("<li>Add a snippet</li>"));

    let failed = ValidationResult { is_valid: false, confidence_score: 0.0, ..v };
    let html = Renderer::default().validation(&failed).into_string();
    assert!(html.contains("validation-banner fail"));
    assert!(html.contains("0.0%"));
  }

  #[test]
  fn confidence_formatting() {
    assert_eq!(confidence_percent(1.0), "100.0%");
    assert_eq!(confidence_percent(0.5), "50.0%");
  }

  #[test]
  fn quiz_card_has_apply_action() {
    let q = QuizResult {
      question: "Write a function to reverse a string.".into(),
      topic_meta: Some(TopicMeta { platform: "iOS".into(), technology: "Swift".into(), name: "Strings".into() }),
      tags: vec![],
    };
    let html = Renderer::default().quiz_card("ios|swift|strings", &q).into_string();
    assert!(html.contains("hx-post=\"/ui/quiz/apply\""));
    assert!(html.contains("id=\"quiz-ios-swift-strings\""));
    assert!(html.contains("&quot;quiz_key&quot;:&quot;ios|swift|strings&quot;"));
    assert!(html.contains("<span class=\"badge\">Strings</span>"));
  }

  #[test]
  fn error_block_shows_title_and_details() {
    let err = UiError::Backend { kind: BackendErrorKind::RateLimit, message: "429".into(), details: None };
    let html = error_block(&err.view()).into_string();
    assert!(html.contains("<h3 class=\"error-title\">Rate Limit Exceeded</h3>"));
    assert!(html.contains("<pre class=\"error-details\">429</pre>"));
  }
}
