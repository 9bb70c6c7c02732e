use std::time::Duration;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::{LlmConfig, API_KEY_ENV};
use crate::core::call_graph::FunctionId;
use crate::error::{CodelensError, Result};
use super::prompt::{build_prompt, filter_response};
use super::summarizer::Summarizer;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Factory function to create the configured summarizer
pub fn create_summarizer(config: &LlmConfig) -> Result<Box<dyn Summarizer>> {
    if !config.enabled {
        return Err(CodelensError::Config("LLM integration is disabled".to_string()));
    }

    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiSummarizer::new(config)?)),
        "gemini" => Ok(Box::new(GeminiSummarizer::new(config)?)),
        _ => Err(CodelensError::Config(
            format!("Unsupported LLM provider: {}", config.provider)
        )),
    }
}

fn require_api_key(config: &LlmConfig) -> Result<String> {
    config.resolved_api_key().ok_or_else(|| CodelensError::Config(format!(
        "API key required for provider '{}' (set llm.api_key or {})",
        config.provider, API_KEY_ENV
    )))
}

fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| CodelensError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success HTTP response into an error carrying its body
async fn check_status(provider: &str, response: reqwest::Response) -> Result<serde_json::Value> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(CodelensError::Summarizer(
            format!("{} API error {}: {}", provider, status, error_text)
        ));
    }

    response.json().await
        .map_err(|e| CodelensError::Summarizer(format!("Failed to parse {} response: {}", provider, e)))
}

/// OpenAI chat completions, or any server speaking the same protocol
pub struct OpenAiSummarizer {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiSummarizer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            api_key: require_api_key(config)?,
            client: http_client(config)?,
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    fn payload(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert software engineer reviewing unfamiliar code. Answer concisely."
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "max_tokens": self.config.max_tokens.unwrap_or(2000),
            "temperature": self.config.temperature.unwrap_or(0.3)
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.payload(prompt))
            .send()
            .await
            .map_err(|e| CodelensError::Summarizer(format!("OpenAI API request failed: {}", e)))?;

        let response_data = check_status("OpenAI", response).await?;
        if let Some(usage) = response_data.get("usage") {
            debug!("OpenAI tokens used: {}", usage["total_tokens"]);
        }

        response_data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CodelensError::Summarizer(
                "Failed to extract content from OpenAI response".to_string()
            ))
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, context: &str, functions: &[(FunctionId, String)]) -> Result<Vec<String>> {
        let text = self.complete(&build_prompt(context, functions)).await?;
        Ok(filter_response(&text, functions))
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Google Gemini generateContent
pub struct GeminiSummarizer {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiSummarizer {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            api_key: require_api_key(config)?,
            client: http_client(config)?,
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(GEMINI_BASE_URL);
        let model = self.config.model.trim_start_matches("models/");
        format!("{}/models/{}:generateContent", base.trim_end_matches('/'), model)
    }

    fn payload(&self, prompt: &str) -> serde_json::Value {
        json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "maxOutputTokens": self.config.max_tokens.unwrap_or(2000),
                "temperature": self.config.temperature.unwrap_or(0.3)
            }
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.payload(prompt))
            .send()
            .await
            .map_err(|e| CodelensError::Summarizer(format!("Gemini API request failed: {}", e)))?;

        let response_data = check_status("Gemini", response).await?;

        let parts = response_data["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| CodelensError::Summarizer(
                "Failed to extract content from Gemini response".to_string()
            ))?;

        Ok(parts.iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, context: &str, functions: &[(FunctionId, String)]) -> Result<Vec<String>> {
        let text = self.complete(&build_prompt(context, functions)).await?;
        Ok(filter_response(&text, functions))
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> LlmConfig {
        LlmConfig {
            enabled: true,
            provider: provider.to_string(),
            api_key: Some("test-key".to_string()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_disabled_config_is_rejected() {
        let config = LlmConfig::default();
        assert!(matches!(create_summarizer(&config), Err(CodelensError::Config(_))));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(create_summarizer(&config("carrier-pigeon")).is_err());
    }

    #[test]
    fn test_factory_picks_provider() {
        assert_eq!(create_summarizer(&config("openai")).unwrap().provider_name(), "openai");
        assert_eq!(create_summarizer(&config("gemini")).unwrap().provider_name(), "gemini");
    }

    #[test]
    fn test_openai_endpoint_honours_base_url() {
        let mut config = config("openai");
        config.base_url = Some("http://localhost:11434/v1/".to_string());
        let summarizer = OpenAiSummarizer::new(&config).unwrap();

        assert_eq!(summarizer.endpoint(), "http://localhost:11434/v1/chat/completions");
        let payload = summarizer.payload("hello");
        assert_eq!(payload["messages"][1]["content"], "hello");
        assert_eq!(payload["model"], "gpt-4o-mini");
    }

    #[test]
    fn test_gemini_request_shape() {
        let mut config = config("gemini");
        config.model = "models/gemini-1.5-pro-002".to_string();
        let summarizer = GeminiSummarizer::new(&config).unwrap();

        assert_eq!(
            summarizer.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro-002:generateContent"
        );
        assert_eq!(summarizer.payload("hi")["contents"][0]["parts"][0]["text"], "hi");
    }
}
