//! Canned backend for UI development (`MOCK_BACKEND=1`).
//!
//! Serves the `/api/*` contract with fixed answers so the page can be
//! exercised without the question service. Tests use it as their backend too.

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

pub fn mock_router() -> Router {
    Router::new()
        .route("/api/providers", get(providers))
        .route("/api/agents", get(agents))
        .route("/api/models/:provider", get(models))
        .route("/api/model-description/:provider/:model", get(description))
        .route("/api/check-env-key/:provider", get(check_env_key))
        .route("/api/generate", post(generate))
        .route("/api/validate", post(validate))
        .route("/api/quiz", post(quiz))
        .route("/api/user-quiz", post(quiz))
}

const PROVIDERS: [&str; 3] = ["openai", "anthropic", "google"];

async fn providers() -> Json<Value> {
    Json(json!({ "success": true, "providers": PROVIDERS }))
}

async fn agents() -> Json<Value> {
    Json(json!({ "success": true, "agents": PROVIDERS }))
}

async fn models(Path(provider): Path<String>) -> impl IntoResponse {
    let models = match provider.as_str() {
        "openai" => json!([{ "id": "gpt-4o" }, { "id": "gpt-3.5-turbo" }]),
        "anthropic" => json!([{ "id": "claude-3-opus" }]),
        "google" => json!([{ "id": "gemini-pro" }]),
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": format!("Provider {provider} not found") })),
            )
        }
    };
    (StatusCode::OK, Json(json!({ "success": true, "models": models })))
}

async fn description(Path((provider, model)): Path<(String, String)>) -> Json<Value> {
    Json(json!({ "description": format!("Mock description for {provider}/{model}.") }))
}

async fn check_env_key(Path(_provider): Path<String>) -> Json<Value> {
    Json(json!({ "exists": true, "api_key": "********" }))
}

async fn generate(Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "question": "What is a closure in Swift?\n```swift\nlet closure = { print(\"Hello\") }\n```",
            "tags": ["swift", "closures"],
            "answers": {
                "beginner": {
                    "text": "A closure is a self-contained block of functionality.",
                    "choices": ["A function", "A variable", "A closure", "A class"],
                    "correct": 2
                },
                "intermediate": {
                    "text": "Closures can capture and store references to variables.",
                    "choices": ["True", "False"],
                    "correct": 0
                },
                "advanced": {
                    "text": "Explain how closures capture variables in Swift.",
                    "choices": [],
                    "correct": null
                }
            }
        }
    }))
}

async fn validate(Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": { "validation": "ok", "score": 0.95, "details": "Your answer is correct." }
    }))
}

async fn quiz(Json(body): Json<Value>) -> Json<Value> {
    let ctx = &body["context"];
    let pick = |k: &str, dflt: &str| ctx[k].as_str().filter(|s| !s.is_empty()).unwrap_or(dflt).to_string();
    Json(json!({
        "success": true,
        "data": {
            "agent": { "provider": "openai", "model": "gpt-4o" },
            "quiz": {
                "topic": {
                    "platform": pick("platform", "iOS"),
                    "technology": pick("technology", "Swift"),
                    "topic": pick("topic", "Strings")
                },
                "question": "Write a Swift function to reverse a string.",
                "tags": ["swift", "string"]
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::{backend_for, serve};
    use crate::dispatch::{dispatch, Action, Outcome};
    use crate::domain::{FormState, Tier};

    #[tokio::test]
    async fn canned_generation_decodes_into_three_tiers() {
        let backend = backend_for(&serve(mock_router()).await);
        let form = FormState {
            topic: "Closures".into(),
            platform: "iOS".into(),
            provider: "openai".into(),
            model: "gpt-4o".into(),
            ..FormState::default()
        };
        let Outcome::Generation(g) = dispatch(&backend, "********", Action::Submit, &form).await.unwrap() else {
            panic!("expected generation");
        };
        assert_eq!(g.answer_levels.len(), 3);
        assert_eq!(g.answer_levels[&Tier::Beginner].tests[0].correct_index, Some(2));
        assert!(g.answer_levels[&Tier::Advanced].tests.is_empty());
    }

    #[tokio::test]
    async fn unknown_provider_models_is_an_error() {
        let backend = backend_for(&serve(mock_router()).await);
        assert!(backend.models("mistral").await.is_err());
        assert_eq!(backend.models("google").await.unwrap().len(), 1);
    }
}
