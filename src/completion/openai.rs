//! OpenAI chat-completions backend.

use super::{CompletionBackend, CompletionError, CompletionRequest};
use crate::error::Result;
use crate::openai::create_client_with;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Completion backend that talks to the OpenAI chat API (or a compatible endpoint).
pub struct OpenAIBackend {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl OpenAIBackend {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with(base_url, timeout)?,
        })
    }

    /// Classify an API failure. Invalid requests and arguments are permanent;
    /// everything else (network, timeouts, rate limits, server errors) is transient.
    fn classify(error: OpenAIError) -> CompletionError {
        match &error {
            OpenAIError::ApiError(api) if api.r#type.as_deref() == Some("invalid_request_error") => {
                CompletionError::permanent(format!("OpenAI API error: {}", api.message))
            }
            OpenAIError::InvalidArgument(msg) => {
                CompletionError::permanent(format!("Invalid request: {}", msg))
            }
            _ => CompletionError::transient(format!("OpenAI API error: {}", error)),
        }
    }

    #[allow(deprecated)]
    fn build_request(
        request: &CompletionRequest,
    ) -> std::result::Result<async_openai::types::CreateChatCompletionRequest, CompletionError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.as_str())
                .build()
                .map_err(Self::classify)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.as_str())
                .build()
                .map_err(Self::classify)?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(Self::classify)
    }
}

#[async_trait]
impl CompletionBackend for OpenAIBackend {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, CompletionError> {
        let chat_request = Self::build_request(request)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(Self::classify)?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| CompletionError::transient("Empty response from LLM"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ErrorClass;
    use async_openai::error::ApiError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn api_error(kind: Option<&str>) -> OpenAIError {
        let api: ApiError = serde_json::from_value(serde_json::json!({
            "message": "nope",
            "type": kind,
        }))
        .unwrap();
        OpenAIError::ApiError(api)
    }

    #[test]
    fn test_invalid_request_is_permanent() {
        let err = OpenAIBackend::classify(api_error(Some("invalid_request_error")));
        assert_eq!(err.class, ErrorClass::Permanent);
        let err = OpenAIBackend::classify(OpenAIError::InvalidArgument("x".into()));
        assert_eq!(err.class, ErrorClass::Permanent);
    }

    #[test]
    fn test_other_api_errors_are_transient() {
        assert_eq!(
            OpenAIBackend::classify(api_error(Some("server_error"))).class,
            ErrorClass::Transient
        );
        assert_eq!(OpenAIBackend::classify(api_error(None)).class, ErrorClass::Transient);
    }

    /// Local server that answers every request with HTTP 429 and counts requests.
    async fn rate_limited_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    let body = r#"{"error":{"message":"Rate limit reached","type":"requests","param":null,"code":"rate_limit_exceeded"}}"#;
                    let response = format!(
                        "HTTP/1.1 429 Too Many Requests\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}/v1", addr), hits)
    }

    /// Read headers and the announced body so the client sees a clean response.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let Ok(n) = socket.read(&mut buf).await else {
                return;
            };
            if n == 0 {
                return;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_rate_limit_response_is_one_request_and_transient() {
        let (base_url, hits) = rate_limited_server().await;
        let backend = OpenAIBackend::new(Some(&base_url), Duration::from_secs(5)).unwrap();
        let request = CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            system: "s".to_string(),
            user: "u".to_string(),
            temperature: 0.2,
            max_tokens: 16,
        };

        let outcome = tokio::time::timeout(Duration::from_secs(5), backend.complete(&request))
            .await
            .expect("the client must not keep retrying");

        let err = outcome.unwrap_err();
        assert_eq!(err.class, ErrorClass::Transient);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        backend.complete(&request).await.unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_build_request_carries_parameters() {
        let request = CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            system: "be brief".to_string(),
            user: "summarize".to_string(),
            temperature: 0.3,
            max_tokens: 256,
        };
        let built = OpenAIBackend::build_request(&request).unwrap();
        assert_eq!(built.model, "gpt-4o-mini");
        assert_eq!(built.messages.len(), 2);
        assert_eq!(built.temperature, Some(0.3));
    }
}
