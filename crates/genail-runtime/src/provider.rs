use genail_common::ProviderConfig;
use thiserror::Error;

use crate::value::Message;

// ============================================================================
// Provider trait and types
// ============================================================================

/// What a `generate` statement hands to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateInput {
    /// A single prompt string.
    Prompt(String),
    /// An ordered conversation.
    Messages(Vec<Message>),
}

/// Generation options. `format` and `schema` are passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    pub format: Option<String>,
    pub schema: Option<String>,
}

/// A request to a generation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub input: GenerateInput,
    pub options: GenerateOptions,
}

impl GenerateRequest {
    /// The input as chat messages; a bare prompt becomes one `user` message.
    pub fn chat_messages(&self) -> Vec<Message> {
        match &self.input {
            GenerateInput::Prompt(text) => vec![Message::new("user", text.clone())],
            GenerateInput::Messages(messages) => messages.clone(),
        }
    }
}

/// Failures raised by a provider backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A text-generation backend.
///
/// Calls are blocking; timeouts and retries, if any, belong to the
/// implementation.
pub trait Provider {
    fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError>;
}

impl<P: Provider + ?Sized> Provider for &P {
    fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        (**self).generate(request)
    }
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        (**self).generate(request)
    }
}

// ============================================================================
// Mock Provider (default when nothing is configured)
// ============================================================================

/// A provider that returns deterministic responses without any network access.
///
/// Plain requests echo the whitespace-collapsed input, truncated to
/// `max_tokens` characters: `[model] (temperature, max_tokens) text`.
/// Requests carrying a JSON schema get a mock object matching it.
pub struct MockProvider;

impl Provider for MockProvider {
    fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        if let Some(schema) = request
            .options
            .schema
            .as_deref()
            .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
        {
            return Ok(mock_json_from_schema(&schema));
        }

        let text = match &request.input {
            GenerateInput::Prompt(prompt) => prompt.clone(),
            GenerateInput::Messages(messages) => messages
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        };
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let truncated: String = collapsed
            .chars()
            .take(request.options.max_tokens as usize)
            .collect();

        // `{:?}` keeps a decimal point on integral temperatures: `1.0`, not `1`.
        Ok(format!(
            "[{}] ({:?}, {}) {}",
            request.model,
            request.options.temperature,
            request.options.max_tokens,
            truncated.trim()
        ))
    }
}

/// Generate mock JSON from a JSON Schema.
fn mock_json_from_schema(schema: &serde_json::Value) -> String {
    let mut result = serde_json::Map::new();
    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (name, prop_schema) in props {
            // An enum constraint wins: pick the first allowed value
            if let Some(first) = prop_schema
                .get("enum")
                .and_then(|e| e.as_array())
                .and_then(|vals| vals.first())
            {
                result.insert(name.clone(), first.clone());
                continue;
            }

            let field_type = prop_schema
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("string");
            let mock_value = match field_type {
                "integer" => serde_json::json!(0),
                "number" => serde_json::json!(0.0),
                "boolean" => serde_json::json!(false),
                "array" => serde_json::json!([format!("[mock {} item]", name)]),
                _ => serde_json::Value::String(format!("[mock {}]", name)),
            };
            result.insert(name.clone(), mock_value);
        }
    }
    serde_json::Value::Object(result).to_string()
}

// ============================================================================
// Construction from configuration
// ============================================================================

/// Build the provider selected by a manifest's `[provider]` section.
pub fn provider_from_config(config: &ProviderConfig) -> Result<Box<dyn Provider>, ProviderError> {
    match config.kind.as_str() {
        "mock" => Ok(Box::new(MockProvider)),
        "openai" => {
            let env_name = config.api_key_env.as_deref().ok_or_else(|| {
                ProviderError::Config("provider 'openai' requires api_key_env".into())
            })?;
            let api_key = resolve_api_key(env_name)?;
            Ok(Box::new(crate::providers::openai::OpenAiProvider::new(
                Some(api_key),
                config.base_url.clone(),
                config.timeout,
            )?))
        }
        "ollama" => {
            let api_key = match config.api_key_env.as_deref() {
                Some(env_name) => Some(resolve_api_key(env_name)?),
                None => None,
            };
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| crate::providers::openai::OLLAMA_BASE_URL.to_string());
            Ok(Box::new(crate::providers::openai::OpenAiProvider::new(
                api_key,
                Some(base_url),
                config.timeout,
            )?))
        }
        other => Err(ProviderError::Config(format!(
            "unknown provider kind '{}'",
            other
        ))),
    }
}

/// Read an API key from the named environment variable.
fn resolve_api_key(env_name: &str) -> Result<String, ProviderError> {
    match std::env::var(env_name) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(ProviderError::Config(format!(
            "environment variable '{}' is not set",
            env_name
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
