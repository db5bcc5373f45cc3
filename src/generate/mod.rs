//! Generative content adapters for notes, summaries, and quizzes.
//!
//! One concrete adapter wraps the Ollama `/api/generate` endpoint; the trait
//! keeps the pipeline provider-agnostic so alternate backends can be swapped
//! in without touching callers. Adapters hold no shared mutable state.

/// Quiz payload types and shape validation.
pub mod quiz;

pub use quiz::Quiz;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while generating content.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Provider was unreachable or not serving the configured model.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate content: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed as the expected structure.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Capability set exposed to the processing pipeline.
#[async_trait]
pub trait GenerativeAdapter: Send + Sync {
    /// Transform raw document text into structured Markdown notes.
    async fn generate_notes(&self, text: &str) -> Result<String, AdapterError>;

    /// Produce an adaptive Markdown summary from existing notes.
    async fn generate_summary(&self, text: &str) -> Result<String, AdapterError>;

    /// Produce a structured quiz from existing notes. The response is parsed
    /// strictly; a malformed payload is a hard error.
    async fn generate_quiz(&self, text: &str) -> Result<Quiz, AdapterError>;
}

/// Adapter backed by a local Ollama runtime.
pub struct OllamaAdapter {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaAdapter {
    /// Construct an adapter for the given Ollama base URL and model.
    pub fn new(base_url: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("studydesk/generate")
            .build()
            .expect("Failed to construct reqwest::Client for generation");
        Self {
            http,
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    async fn complete(&self, prompt: String, json_mode: bool) -> Result<String, AdapterError> {
        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                // Lower temperature keeps regenerated artifacts stable.
                "temperature": 0.2,
            }
        });
        if json_mode {
            payload["format"] = json!("json");
        }

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                AdapterError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AdapterError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            AdapterError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(AdapterError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerativeAdapter for OllamaAdapter {
    async fn generate_notes(&self, text: &str) -> Result<String, AdapterError> {
        let notes = self.complete(notes_prompt(text), false).await?;
        tracing::debug!(chars = notes.len(), "Notes generated");
        Ok(notes)
    }

    async fn generate_summary(&self, text: &str) -> Result<String, AdapterError> {
        let summary = self.complete(summary_prompt(text), false).await?;
        tracing::debug!(chars = summary.len(), "Summary generated");
        Ok(summary)
    }

    async fn generate_quiz(&self, text: &str) -> Result<Quiz, AdapterError> {
        let raw = self.complete(quiz_prompt(text), true).await?;
        let quiz: Quiz = serde_json::from_str(&raw).map_err(|error| {
            AdapterError::InvalidResponse(format!("quiz payload did not parse: {error}"))
        })?;
        quiz.validate()
            .map_err(|error| AdapterError::InvalidResponse(error.to_string()))?;
        tracing::debug!("Quiz generated and validated");
        Ok(quiz)
    }
}

fn notes_prompt(text: &str) -> String {
    format!(
        "You are an expert note-taking assistant for complex material. Transform the \
         following raw text into clear, structured notes written in pure Markdown.\n\
         \n\
         Output rules:\n\
         - Return only the Markdown content, with no commentary or framing sentences.\n\
         - Organize the material with headings, starting at `##` for top-level sections.\n\
         - Use **bold** for definitions, keywords, and essential facts.\n\
         - Preserve any source code verbatim in fenced code blocks with a language tag.\n\
         - Include sections titled exactly \"Questions for Reflection\", \
           \"Examples & Applications\", \"Glossary\", and \"Main Takeaways\".\n\
         \n\
         Document text:\n---\n{text}\n---\n"
    )
}

fn summary_prompt(text: &str) -> String {
    format!(
        "You are an expert summarization assistant. Read the following notes and produce \
         a clear, cohesive summary formatted in Markdown.\n\
         - Adapt length, structure, and detail to the size of the notes.\n\
         - Use multiple paragraphs, and optional `##` headings, when the material warrants it.\n\
         - Preserve key ideas and conclusions while removing redundancy.\n\
         - Do not include meta commentary such as \"Here is the summary\".\n\
         \n\
         Notes:\n---\n{text}\n---\n"
    )
}

fn quiz_prompt(text: &str) -> String {
    format!(
        "Create an educational quiz from the following notes. Respond with valid JSON only, \
         containing exactly three top-level keys:\n\
         1. \"multiple_choice\": a list of exactly 20 objects, each with \"question\" (string), \
         \"options\" (exactly 4 strings), and \"correct_answer_index\" (integer 0-3).\n\
         2. \"fill_in_the_blanks\": a list of exactly 5 objects, each with \"question\" \
         (string containing the placeholder \"____\") and \"answer\" (string).\n\
         3. \"answer_key\": an object with \"multiple_choice\" (20 correct answers as text, \
         not indices) and \"fill_in_the_blanks\" (5 correct answers as text).\n\
         Return only syntactically valid JSON with no commentary.\n\
         \n\
         Notes:\n---\n{text}\n---\n"
    )
}

#[cfg(test)]
mod tests {
    use super::quiz::fixtures::valid_quiz;
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn adapter_for(server: &MockServer) -> OllamaAdapter {
        OllamaAdapter::new(server.base_url(), "test-gen".into())
    }

    #[tokio::test]
    async fn notes_request_round_trips() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(json!({ "model": "test-gen", "stream": false }).to_string());
                then.status(200).json_body(json!({
                    "response": "## Overview\n\n## Glossary\n",
                    "done": true
                }));
            })
            .await;

        let notes = adapter_for(&server)
            .generate_notes("raw document text")
            .await
            .expect("notes");

        mock.assert();
        assert!(notes.contains("## Glossary"));
    }

    #[tokio::test]
    async fn error_status_is_a_generation_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = adapter_for(&server)
            .generate_summary("notes")
            .await
            .expect_err("error response");
        assert!(matches!(error, AdapterError::GenerationFailed(message) if message.contains("500")));
    }

    #[tokio::test]
    async fn incomplete_response_is_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let error = adapter_for(&server)
            .generate_notes("text")
            .await
            .expect_err("incomplete response");
        assert!(matches!(error, AdapterError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn quiz_parses_strictly() {
        let server = MockServer::start_async().await;
        let quiz_json = serde_json::to_string(&valid_quiz()).expect("serialize fixture");
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(json!({ "format": "json" }).to_string());
                then.status(200)
                    .json_body(json!({ "response": quiz_json, "done": true }));
            })
            .await;

        let quiz = adapter_for(&server)
            .generate_quiz("notes text")
            .await
            .expect("quiz");
        assert_eq!(quiz.multiple_choice.len(), 20);
        assert_eq!(quiz.fill_in_the_blanks.len(), 5);
    }

    #[tokio::test]
    async fn malformed_quiz_is_a_hard_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "{\"multiple_choice\": \"not a list\"}",
                    "done": true
                }));
            })
            .await;

        let error = adapter_for(&server)
            .generate_quiz("notes text")
            .await
            .expect_err("malformed quiz");
        assert!(matches!(error, AdapterError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn short_quiz_fails_shape_validation() {
        let server = MockServer::start_async().await;
        let mut quiz = valid_quiz();
        quiz.multiple_choice.truncate(3);
        let quiz_json = serde_json::to_string(&quiz).expect("serialize fixture");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": quiz_json, "done": true }));
            })
            .await;

        let error = adapter_for(&server)
            .generate_quiz("notes text")
            .await
            .expect_err("shape violation");
        assert!(
            matches!(error, AdapterError::InvalidResponse(message) if message.contains("multiple choice"))
        );
    }
}
