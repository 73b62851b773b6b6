pub mod ollama;
pub mod openai;

use painmine_core::config::LlmConfig;

use crate::traits::{Embedder, EmbeddingError};

pub fn create_embedder(config: &LlmConfig) -> Result<Box<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(ollama::OllamaEmbedder::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
            config.embedding_dimensions as usize,
        ))),
        _ => {
            let api_key = config.openai_api_key.clone().unwrap_or_default();
            Ok(Box::new(openai::OpenAiEmbedder::new(
                api_key,
                config.embedding_model.clone(),
                "https://api.openai.com".to_string(),
                config.embedding_dimensions as usize,
            )))
        }
    }
}
