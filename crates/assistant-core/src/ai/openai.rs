use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::CompletionService;
use crate::error::CompletionError;
use crate::state::ChatRequest;

pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    endpoint: String,
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self::with_endpoint(OPENAI_CHAT_COMPLETIONS_URL)
    }

    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn query(&self, api_key: &str, request: &ChatRequest) -> Result<String, CompletionError> {
        debug!(endpoint = %self.endpoint, model = %request.model, "posting chat completion");

        let response = self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "completion endpoint returned an error");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        parse_completion(&body)
    }
}

#[async_trait]
impl CompletionService for OpenAIClient {
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String, CompletionError> {
        self.query(api_key, request).await
    }
}

/// Pulls `choices[0].message.content` out of a success body.
fn parse_completion(body: &[u8]) -> Result<String, CompletionError> {
    let parsed: OpenAIResponse = serde_json::from_slice(body)
        .map_err(|e| CompletionError::malformed(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::malformed("response contained no choices"))?
        .message
        .content
        .ok_or_else(|| CompletionError::malformed("first choice has no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AiModel;
    use crate::state::SessionInput;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(system: &str, prompt: &str) -> ChatRequest {
        ChatRequest::new(
            AiModel::Gpt35Turbo,
            &SessionInput {
                system_text: system.to_string(),
                prompt_text: prompt.to_string(),
            },
        )
    }

    fn client_for(server: &MockServer) -> OpenAIClient {
        OpenAIClient::with_endpoint(&format!("{}/v1/chat/completions", server.uri()))
    }

    #[test]
    fn test_parse_completion_first_choice() {
        let body = br#"{"choices":[{"message":{"content":"one"}},{"message":{"content":"two"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "one");
    }

    #[test]
    fn test_parse_completion_rejects_missing_choices() {
        assert!(parse_completion(br#"{"choices":[]}"#).unwrap_err().is_malformed());
        assert!(parse_completion(br#"{"id":"x"}"#).unwrap_err().is_malformed());
        assert!(parse_completion(b"not json").unwrap_err().is_malformed());
        assert!(parse_completion(br#"{"choices":[{"message":{"content":null}}]}"#)
            .unwrap_err()
            .is_malformed());
    }

    #[tokio::test]
    async fn test_query_sends_contract_and_reads_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "S"},
                    {"role": "user", "content": "P"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Hello!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let text = client.query("sk-test", &request("S", "P")).await.unwrap();
        assert_eq!(text, "Hello!");
    }

    #[tokio::test]
    async fn test_query_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.query("bad", &request("S", "P")).await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_query_malformed_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"object": "list"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.query("sk-test", &request("S", "P")).await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn test_query_transport_failure() {
        // Nothing listens on port 9 on loopback.
        let client = OpenAIClient::with_endpoint("http://127.0.0.1:9/v1/chat/completions");
        let err = client.query("sk-test", &request("S", "P")).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }
}
