//! Text-completion capability and the retrying client built on top of it.

mod openai;
mod retry;

pub use openai::OpenAIBackend;
pub use retry::{retry, RetryError, RetryPolicy};

use crate::error::{Result, TldwError};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Whether a failed completion is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// Timeouts, server errors, rate limits, malformed responses.
    Transient,
    /// Requests that can never succeed as sent, e.g. an invalid key or request.
    Permanent,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Permanent => write!(f, "permanent"),
        }
    }
}

/// A single failed call to the completion backend.
#[derive(Debug, Clone)]
pub struct CompletionError {
    pub class: ErrorClass,
    pub message: String,
}

impl CompletionError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Permanent,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.class)
    }
}

/// A chat completion request: one system and one user message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for text-completion backends.
///
/// Calls must be safe to repeat: the client retries a request verbatim.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, CompletionError>;
}

/// Completion client bound to one model, retrying transient failures.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    policy: RetryPolicy,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request a completion. Transient failures are retried with backoff;
    /// the last failure is returned once the attempts are exhausted.
    #[instrument(skip(self, system, user), fields(model = %self.model, prompt_len = user.len()))]
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            system: system.to_string(),
            user: user.to_string(),
            temperature,
            max_tokens: max_output_tokens,
        };

        let output = retry(&self.policy, |attempt| {
            debug!(attempt, "Sending completion request");
            self.backend.complete(&request)
        })
        .await
        .map_err(|e| TldwError::Completion {
            class: e.error.class,
            attempts: e.attempts,
            message: e.error.message,
        })?;

        Ok(output.trim().to_string())
    }
}
