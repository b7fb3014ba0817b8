//! OpenAI-compatible chat-completion client with a single timeout retry.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionError, TextGenerator};
use crate::config::LlmConfig;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Pause before the one retry that follows a timeout.
const TIMEOUT_BACKOFF: Duration = Duration::from_millis(400);

pub struct ChatCompletionClient {
    config: LlmConfig,
    client: Client,
}

impl ChatCompletionClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    async fn send_once(
        &self,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<(u16, String), reqwest::Error> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingCredential)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let started = Instant::now();
        let mut attempt = 0;
        let (status, body) = loop {
            attempt += 1;
            match self.send_once(api_key, &request).await {
                Ok(reply) => break reply,
                Err(e) if e.is_timeout() && attempt == 1 => {
                    tracing::warn!(
                        timeout_secs = self.config.timeout_secs,
                        "LLM request timed out, retrying once"
                    );
                    tokio::time::sleep(TIMEOUT_BACKOFF).await;
                }
                Err(e) if e.is_timeout() => {
                    crate::metrics::llm_request("timeout", elapsed_ms(started));
                    return Err(CompletionError::Timeout {
                        secs: self.config.timeout_secs,
                    });
                }
                Err(e) => {
                    crate::metrics::llm_request("transport", elapsed_ms(started));
                    return Err(CompletionError::Transport(e.to_string()));
                }
            }
        };

        if status >= 400 {
            crate::metrics::llm_request("http_error", elapsed_ms(started));
            return Err(CompletionError::Http {
                status,
                message: error_message(&body),
            });
        }

        let content = completion_content(&body);
        crate::metrics::llm_request(
            if content.is_ok() { "ok" } else { "invalid" },
            elapsed_ms(started),
        );
        content
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Message of a structured `{"error": {"message": ..}}` body, else the raw body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .and_then(|err| err.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string())
}

/// `choices[0].message.content` of a chat-completion response body.
pub fn completion_content(body: &str) -> Result<String, CompletionError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::InvalidResponse("no choices in response".to_string()))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    /// How the local server treats every accepted connection.
    #[derive(Clone, Copy)]
    enum Reply {
        Stall,
        Hangup,
        Respond(u16, &'static str),
    }

    struct LocalServer {
        addr: SocketAddr,
        accepted: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl LocalServer {
        async fn start(reply: Reply) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let accepted = Arc::new(AtomicUsize::new(0));
            let requests = Arc::new(Mutex::new(Vec::new()));

            let (count, seen) = (accepted.clone(), requests.clone());
            tokio::spawn(async move {
                let mut held = Vec::new();
                while let Ok((mut stream, _)) = listener.accept().await {
                    count.fetch_add(1, Ordering::SeqCst);
                    match reply {
                        Reply::Stall => held.push(stream),
                        Reply::Hangup => drop(stream),
                        Reply::Respond(status, body) => {
                            let request = read_request(&mut stream).await;
                            seen.lock().unwrap().push(request);
                            let response = format!(
                                "HTTP/1.1 {status} Local\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                                body.len()
                            );
                            let _ = stream.write_all(response.as_bytes()).await;
                            let _ = stream.shutdown().await;
                        }
                    }
                }
            });

            Self { addr, accepted, requests }
        }

        fn client(&self) -> ChatCompletionClient {
            ChatCompletionClient::new(LlmConfig {
                api_key: Some("test-key".to_string()),
                base_url: format!("http://{}", self.addr),
                timeout_secs: 1,
                ..LlmConfig::default()
            })
            .unwrap()
        }

        fn accepted(&self) -> usize {
            self.accepted.load(Ordering::SeqCst)
        }
    }

    /// Reads the request head plus a `content-length` body.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn timeout_is_retried_once_then_reported() {
        let server = LocalServer::start(Reply::Stall).await;
        let started = Instant::now();

        let err = server.client().generate("hello").await.unwrap_err();

        assert!(matches!(err, CompletionError::Timeout { secs: 1 }), "{err:?}");
        assert_eq!(server.accepted(), 2);
        // Two full timeouts plus the pause between them.
        assert!(started.elapsed() >= Duration::from_secs(2) + TIMEOUT_BACKOFF);
    }

    #[tokio::test]
    async fn http_error_is_not_retried_and_carries_api_message() {
        let server = LocalServer::start(Reply::Respond(
            429,
            r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#,
        ))
        .await;

        let err = server.client().generate("hello").await.unwrap_err();

        match err {
            CompletionError::Http { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("expected http error, got {other:?}"),
        }
        assert_eq!(server.accepted(), 1);
    }

    #[tokio::test]
    async fn dropped_connection_is_a_transport_error() {
        let server = LocalServer::start(Reply::Hangup).await;

        let err = server.client().generate("hello").await.unwrap_err();

        assert!(matches!(err, CompletionError::Transport(_)), "{err:?}");
        assert_eq!(server.accepted(), 1);
    }

    #[tokio::test]
    async fn success_posts_bearer_request_and_returns_content() {
        let server = LocalServer::start(Reply::Respond(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#,
        ))
        .await;

        let content = server.client().generate("hello").await.unwrap();

        assert_eq!(content, "hi");
        assert_eq!(server.accepted(), 1);
        let request = server.requests.lock().unwrap()[0].to_ascii_lowercase();
        assert!(request.starts_with("post /chat/completions "));
        assert!(request.contains("authorization: bearer test-key"));
        assert!(request.contains(r#""content":"hello""#));
    }

    #[tokio::test]
    async fn missing_credential_fails_without_network() {
        let client = ChatCompletionClient::new(LlmConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            ..LlmConfig::default()
        })
        .unwrap();

        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingCredential));
    }

    #[test]
    fn error_message_prefers_structured_body() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
        assert_eq!(error_message(body), "Rate limit reached");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(r#"{"error": {}}"#), r#"{"error": {}}"#);
    }

    #[test]
    fn content_is_read_from_first_choice() {
        let body = r#"{"id":"x","choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        assert_eq!(completion_content(body).unwrap(), "hi");
    }

    #[test]
    fn empty_choices_is_an_invalid_response() {
        let err = completion_content(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, CompletionError::InvalidResponse(_)));
    }

    #[test]
    fn http_error_display_carries_status() {
        let err = CompletionError::Http {
            status: 429,
            message: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "LLM HTTP 429: slow down");
    }
}
