use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use thiserror::Error;

use redesign_core::AiSettings;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("build LLM: {0}")]
    Build(String),
    #[error("chat: {0}")]
    Chat(String),
    #[error("LLM returned {0}")]
    EmptyResponse(&'static str),
}

/// Produces text for a system prompt plus a single user message.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user_msg: &str) -> Result<String, GenerationError>;
}

fn map_backend(provider: &str) -> Result<LLMBackend, GenerationError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(GenerationError::UnknownProvider(other.to_string())),
    }
}

/// Generator backed by whichever provider the AI settings name.
pub struct LlmGenerator {
    settings: AiSettings,
}

impl LlmGenerator {
    pub fn new(settings: AiSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, system: &str, user_msg: &str) -> Result<String, GenerationError> {
        let backend = map_backend(&self.settings.provider)?;

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .model(&self.settings.model)
            .system(system);

        if !self.settings.api_key.is_empty() {
            builder = builder.api_key(&self.settings.api_key);
        }

        let llm = builder
            .build()
            .map_err(|e| GenerationError::Build(e.to_string()))?;

        let messages = vec![ChatMessage::user().content(user_msg).build()];

        tracing::info!(
            provider = %self.settings.provider,
            model = %self.settings.model,
            input_bytes = user_msg.len(),
            "sending generation request"
        );
        let response = llm
            .chat(&messages)
            .await
            .map_err(|e| GenerationError::Chat(e.to_string()))?;

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(GenerationError::EmptyResponse("empty text")),
            None => Err(GenerationError::EmptyResponse("no text")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_map_to_backends() {
        for provider in ["openai", "anthropic", "google", "ollama", "groq", "mistral", "deepseek"] {
            assert!(map_backend(provider).is_ok(), "{provider} should be supported");
        }
    }

    #[tokio::test]
    async fn unknown_provider_fails_before_any_request() {
        let generator = LlmGenerator::new(AiSettings {
            provider: "clippy".into(),
            api_key: String::new(),
            model: "m".into(),
        });
        let err = generator.generate("sys", "user").await.unwrap_err();
        assert!(matches!(err, GenerationError::UnknownProvider(p) if p == "clippy"));
    }
}
