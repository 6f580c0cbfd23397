#[cfg(test)]
mod tests {
    use crate::config::{Config, LLMConfig, LLMProvider, RetrievalConfig};
    use crate::pipeline::policy::StageFailurePolicy;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.documents_path, PathBuf::from("./documents"));
        assert_eq!(config.output_path, PathBuf::from("./paperforge.out"));
        assert_eq!(config.store.data_dir, PathBuf::from(".paperforge"));
        assert_eq!(config.document_patterns, vec!["*.txt", "*.md"]);
        assert!(!config.pipeline.clear_derived_on_rerun);
        assert!(config.pipeline.failure_policy.is_empty());
        assert!(!config.verbose);
    }

    #[test]
    fn test_llm_provider_default() {
        assert_eq!(LLMProvider::default(), LLMProvider::Gemini);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!("openai".parse::<LLMProvider>().unwrap(), LLMProvider::OpenAI);
        assert_eq!("Gemini".parse::<LLMProvider>().unwrap(), LLMProvider::Gemini);
        assert_eq!(
            "anthropic".parse::<LLMProvider>().unwrap(),
            LLMProvider::Anthropic
        );
        assert_eq!(
            "deepseek".parse::<LLMProvider>().unwrap(),
            LLMProvider::DeepSeek
        );
        assert_eq!(
            "openrouter".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenRouter
        );
        assert_eq!("ollama".parse::<LLMProvider>().unwrap(), LLMProvider::Ollama);

        assert!("invalid".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_llm_provider_display_round_trip() {
        for provider in LLMProvider::ALL {
            assert_eq!(provider.to_string().parse::<LLMProvider>().unwrap(), provider);
        }
    }

    #[test]
    fn test_embedding_support() {
        assert!(LLMProvider::Gemini.supports_embeddings());
        assert!(LLMProvider::OpenAI.supports_embeddings());
        assert!(!LLMProvider::Anthropic.supports_embeddings());
        assert!(!LLMProvider::DeepSeek.supports_embeddings());
    }

    #[test]
    fn test_llm_config_default() {
        let config = LLMConfig::default();

        assert_eq!(config.provider, LLMProvider::Gemini);
        assert_eq!(config.model_efficient, "gemini-2.5-flash");
        assert!(!config.model_powerful.is_empty());
        assert!(!config.embedding_model.is_empty());
        assert_eq!(config.max_tokens, 8192);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert_eq!(config.max_parallels, 4);
    }

    #[test]
    fn test_retrieval_config_default() {
        let config = RetrievalConfig::default();

        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.min_similarity, 0.5);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_config_from_file_partial() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("paperforge.toml");
        std::fs::write(
            &config_path,
            r#"
documents_path = "/data/papers"
verbose = true

[llm]
provider = "openai"
model_efficient = "gpt-4o-mini"
retry_attempts = 5

[retrieval]
top_k = 8

[pipeline]
clear_derived_on_rerun = true

[pipeline.failure_policy]
hypothesis = "abort"
"#,
        )
        .unwrap();

        let config = Config::from_file(&config_path).unwrap();

        assert_eq!(config.documents_path, PathBuf::from("/data/papers"));
        assert!(config.verbose);
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model_efficient, "gpt-4o-mini");
        assert_eq!(config.llm.retry_attempts, 5);
        // 未配置的字段回落到默认值
        assert_eq!(config.llm.max_tokens, 8192);
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.chunk_size, 500);
        assert!(config.pipeline.clear_derived_on_rerun);
        assert_eq!(
            config.pipeline.failure_policy.get("hypothesis"),
            Some(&StageFailurePolicy::Abort)
        );
    }

    #[test]
    fn test_config_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::from_file(&temp_dir.path().join("missing.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_from_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        std::fs::write(&config_path, "documents_path = [").unwrap();

        assert!(Config::from_file(&config_path).is_err());
    }

    #[test]
    fn test_load_with_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custom.toml");
        std::fs::write(&config_path, "output_path = \"/tmp/out\"\n").unwrap();

        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.output_path, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_base_url_follows_provider_unless_configured() {
        let mut config = LLMConfig::default();
        assert_eq!(config.base_url(), "https://generativelanguage.googleapis.com");

        config.provider = LLMProvider::OpenAI;
        assert_eq!(config.base_url(), "https://api.openai.com/v1");
        config.provider = LLMProvider::DeepSeek;
        assert_eq!(config.base_url(), "https://api.deepseek.com");

        config.api_base_url = "http://proxy.local/v1".to_string();
        assert_eq!(config.base_url(), "http://proxy.local/v1");
    }
}
