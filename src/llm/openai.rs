use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{LlmProvider, ProviderError};
use super::types::ChatRequest;

const PROVIDER_NAME: &str = "openai";

/// Client for OpenAI-compatible `/chat/completions` and `/embeddings`
/// endpoints (OpenAI, LM Studio, vLLM, Ollama's OpenAI shim).
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            let auth = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| ProviderError::Unavailable("invalid API key".to_string()))?;
            headers.insert(AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Transport {
                provider: PROVIDER_NAME.to_string(),
                source: e,
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                provider: PROVIDER_NAME.to_string(),
                source: e,
            })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: PROVIDER_NAME.to_string(),
                status,
                body: text,
            });
        }

        Ok(res)
    }
}

fn payload_error(message: impl Into<String>) -> ProviderError {
    ProviderError::Payload {
        provider: PROVIDER_NAME.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        let res = self.post("chat/completions", &body).await?;
        let payload: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| payload_error(e.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| payload_error("completion has no message content"))
    }

    async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self.post("embeddings", &body).await?;
        let mut payload: EmbeddingResponse = res
            .json()
            .await
            .map_err(|e| payload_error(e.to_string()))?;

        if payload.data.len() != inputs.len() {
            return Err(payload_error(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                payload.data.len()
            )));
        }

        payload.data.sort_by_key(|item| item.index);
        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned HTTP response and hands back the raw request text.
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{}/v1", addr), handle)
    }

    #[tokio::test]
    async fn chat_sends_sampling_params_and_returns_content() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"Check the drive belt."}}]}"#,
        )
        .await;
        let provider =
            OpenAiProvider::new(&base_url, Some("sk-test"), Duration::from_secs(5)).unwrap();

        let request = ChatRequest::new(vec![ChatMessage::user("belt slipping")])
            .with_temperature(0.0)
            .with_max_tokens(1000);
        let answer = provider.chat(request, "gpt-4o").await.unwrap();

        assert_eq!(answer, "Check the drive belt.");
        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat/completions"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(raw.contains(r#""temperature":0.0"#));
        assert!(raw.contains(r#""max_tokens":1000"#));
    }

    #[tokio::test]
    async fn embed_orders_vectors_by_index() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .await;
        let provider = OpenAiProvider::new(&base_url, None, Duration::from_secs(5)).unwrap();

        let vectors = provider
            .embed(&["first".to_string(), "second".to_string()], "text-embedding-3-large")
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert!(server.await.unwrap().starts_with("POST /v1/embeddings"));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let (base_url, _server) =
            serve_once("429 Too Many Requests", r#"{"error":"rate limited"}"#).await;
        let provider = OpenAiProvider::new(&base_url, None, Duration::from_secs(5)).unwrap();

        let err = provider
            .chat(ChatRequest::new(vec![ChatMessage::user("hi")]), "gpt-4o")
            .await
            .unwrap_err();

        match err {
            ProviderError::Status { status, body, .. } => {
                assert_eq!(status, 429);
                assert!(body.contains("rate limited"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn embedding_count_mismatch_is_a_payload_error() {
        let (base_url, _server) =
            serve_once("200 OK", r#"{"data":[{"index":0,"embedding":[1.0]}]}"#).await;
        let provider = OpenAiProvider::new(&base_url, None, Duration::from_secs(5)).unwrap();

        let err = provider
            .embed(&["a".to_string(), "b".to_string()], "m")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Payload { .. }));
    }
}
