use std::time::Duration;

use reqwest::blocking::Client;

use crate::provider::{GenerateRequest, Provider, ProviderError};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// OpenAI-compatible chat completions provider.
///
/// Works with the OpenAI API and any compatible endpoint (Ollama, Groq, local
/// servers). Requests without an API key omit the `Authorization` header.
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout_secs: Option<u32>,
    ) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(u64::from(secs)));
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(OpenAiProvider {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        })
    }

    /// Build the JSON request body for the chat completions API.
    pub fn build_request_body(
        request: &GenerateRequest,
    ) -> Result<serde_json::Value, ProviderError> {
        let messages: Vec<serde_json::Value> = request
            .chat_messages()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role,
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.options.temperature,
            "max_tokens": request.options.max_tokens,
        });

        if let Some(ref schema) = request.options.schema {
            let schema: serde_json::Value = serde_json::from_str(schema)
                .map_err(|e| ProviderError::InvalidRequest(format!("schema is not JSON: {}", e)))?;
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "schema": schema,
                    "strict": true,
                }
            });
        } else if request.options.format.as_deref() == Some("json") {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        Ok(body)
    }

    /// Extract the generated text from a chat completions response.
    pub fn parse_response(json: &serde_json::Value) -> Result<String, ProviderError> {
        let choice = json
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| ProviderError::InvalidResponse("no message in choice".into()))?;

        Ok(message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .to_string())
    }
}

impl Provider for OpenAiProvider {
    fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = Self::build_request_body(request)?;

        tracing::debug!(url = %url, model = %request.model, "sending chat completion");

        let mut http = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(ref key) = self.api_key {
            http = http.header("Authorization", format!("Bearer {}", key));
        }

        let response = http.send().map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .map_err(|e| ProviderError::Http(format!("read error: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let json: serde_json::Value = serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        Self::parse_response(&json)
    }
}

// ============================================================================
// Tests
// ============================================================================
