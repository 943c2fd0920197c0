use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::errors::ProviderError;

/// Common message structure for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

/// Enum-based LLM provider implementation for better compatibility
#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAi(OpenAiProvider),
    Gemini(GeminiProvider),
}

impl LlmProvider {
    /// Make a request to the LLM provider with optional system message
    pub async fn make_request(
        &self,
        system_message: Option<&str>,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        match self {
            LlmProvider::OpenAi(provider) => provider.make_request(system_message, prompt).await,
            LlmProvider::Gemini(provider) => provider.make_request(system_message, prompt).await,
        }
    }

    /// Get the provider name for logging
    pub fn provider_name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi(provider) => provider.provider_name(),
            LlmProvider::Gemini(provider) => provider.provider_name(),
        }
    }

    /// Get the model name being used
    pub fn model_name(&self) -> &str {
        match self {
            LlmProvider::OpenAi(provider) => provider.model_name(),
            LlmProvider::Gemini(provider) => provider.model_name(),
        }
    }
}

/// OpenAI provider implementation
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

/// OpenAI-specific request structures
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<LlmMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiChoice {
    message: LlmMessage,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }

    pub async fn make_request(
        &self,
        system_message: Option<&str>,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            messages.push(LlmMessage {
                role: "system".to_string(),
                content: sys_msg.to_string(),
            });
        }

        messages.push(LlmMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request_body = OpenAiRequest {
            model: self.model.clone(),
            messages,
        };

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(ProviderError::from_status(status, &error_text));
        }

        let openai_response: OpenAiResponse = response.json().await?;

        let Some(choice) = openai_response.choices.first() else {
            return Err(ProviderError::Parsing(
                "No choices in OpenAI response".to_string(),
            ));
        };

        let response_content = choice.message.content.clone();
        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Gemini provider implementation
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

/// Gemini-specific request structures
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: i32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            model: model.unwrap_or_else(|| "gemini-2.0-flash-exp".to_string()),
        }
    }

    pub async fn make_request(
        &self,
        system_message: Option<&str>,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let full_prompt = match system_message {
            Some(sys_msg) => format!("{}\n\n{}", sys_msg, prompt),
            None => prompt.to_string(),
        };

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: full_prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.9,
                max_output_tokens: 2048,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(ProviderError::from_status(status, &error_text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let text = gemini_response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.clone())
            .ok_or_else(|| {
                ProviderError::Parsing("No candidates in Gemini response".to_string())
            })?;

        info!(
            provider = self.provider_name(),
            response_length = text.len(),
            "Successfully received LLM response"
        );

        Ok(text)
    }

    pub fn provider_name(&self) -> &'static str {
        "Gemini"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Centralized JSON response parser with robust extraction logic
#[derive(Debug, Clone, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Extract JSON from LLM responses that might be wrapped in markdown or other formatting
    pub fn extract_json_from_response(content: &str) -> String {
        // Try to find JSON within markdown code blocks
        if let Some(start) = content.find("```json") {
            if let Some(end) = content[start + 7..].find("```") {
                let json_start = start + 7;
                let json_end = json_start + end;
                return content[json_start..json_end].trim().to_string();
            }
        }

        // Try to find JSON within plain code blocks
        if let Some(start) = content.find("```") {
            if let Some(end) = content[start + 3..].find("```") {
                let json_start = start + 3;
                let json_end = json_start + end;
                let potential_json = content[json_start..json_end].trim();
                if potential_json.starts_with('{') || potential_json.starts_with('[') {
                    return potential_json.to_string();
                }
            }
        }

        // Try to find standalone JSON objects
        if let Some(start) = content.find('{') {
            if let Some(end) = content.rfind('}') {
                if end > start {
                    return content[start..=end].to_string();
                }
            }
        }

        // Try to find standalone JSON arrays
        if let Some(start) = content.find('[') {
            if let Some(end) = content.rfind(']') {
                if end > start {
                    return content[start..=end].to_string();
                }
            }
        }

        // Return original content if no JSON extraction patterns match
        content.trim().to_string()
    }

    /// Parse JSON response into a specific type with error handling
    pub fn parse_json_response<T>(&self, content: &str) -> Result<T, ProviderError>
    where
        T: serde::de::DeserializeOwned,
    {
        let json_content = Self::extract_json_from_response(content);
        serde_json::from_str::<T>(&json_content).map_err(|e| {
            ProviderError::Parsing(format!("Failed to parse JSON response: {}", e))
        })
    }
}

/// Factory for creating LLM providers based on provider type
pub struct ProviderFactory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LlmProviderType {
    OpenAi,
    Gemini,
}

impl ProviderFactory {
    /// Create a new LLM provider instance based on provider type
    pub fn create_provider(
        provider_type: LlmProviderType,
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
    ) -> LlmProvider {
        match provider_type {
            LlmProviderType::OpenAi => {
                LlmProvider::OpenAi(OpenAiProvider::new(api_key, base_url, model))
            }
            LlmProviderType::Gemini => {
                LlmProvider::Gemini(GeminiProvider::new(api_key, base_url, model))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_json_fence() {
        let content = "Here you go:\n```json\n{\"cards\": []}\n```\nDone.";
        assert_eq!(
            JsonResponseParser::extract_json_from_response(content),
            "{\"cards\": []}"
        );
    }

    #[test]
    fn test_extract_from_plain_fence() {
        let content = "```\n[1, 2, 3]\n```";
        assert_eq!(JsonResponseParser::extract_json_from_response(content), "[1, 2, 3]");
    }

    #[test]
    fn test_extract_bare_object() {
        let content = "The result is {\"a\": 1} as requested.";
        assert_eq!(JsonResponseParser::extract_json_from_response(content), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_bare_array() {
        let content = "Answer: [\"가\", \"나\"] end";
        assert_eq!(
            JsonResponseParser::extract_json_from_response(content),
            "[\"가\", \"나\"]"
        );
    }

    #[test]
    fn test_parse_typed_response() {
        #[derive(Deserialize)]
        struct Payload {
            count: u32,
        }
        let parser = JsonResponseParser;
        let payload: Payload = parser
            .parse_json_response("```json\n{\"count\": 4}\n```")
            .unwrap();
        assert_eq!(payload.count, 4);
    }

    #[test]
    fn test_parse_failure_is_parsing_error() {
        let parser = JsonResponseParser;
        let err = parser
            .parse_json_response::<serde_json::Value>("no json here at all")
            .unwrap_err();
        assert_eq!(err.kind(), "parsing_error");
    }

    #[test]
    fn test_factory_builds_requested_provider() {
        let provider = ProviderFactory::create_provider(
            LlmProviderType::Gemini,
            "key".to_string(),
            None,
            None,
        );
        assert_eq!(provider.provider_name(), "Gemini");
        assert_eq!(provider.model_name(), "gemini-2.0-flash-exp");

        let provider = ProviderFactory::create_provider(
            LlmProviderType::OpenAi,
            "key".to_string(),
            None,
            Some("gpt-4o".to_string()),
        );
        assert_eq!(provider.provider_name(), "OpenAI");
        assert_eq!(provider.model_name(), "gpt-4o");
    }
}
