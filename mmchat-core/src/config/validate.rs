//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.chat_history_path.trim().is_empty() {
        errors.push("chat_history_path must not be empty".to_string());
    }

    let chat = &config.providers.chat;
    if chat.api_base.trim().is_empty() {
        errors.push("providers.chat.api_base must not be empty".to_string());
    }
    if chat.max_tokens == 0 {
        errors.push("providers.chat.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&chat.temperature) {
        errors.push("providers.chat.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.providers.vision.max_tokens == 0 {
        errors.push("providers.vision.max_tokens must be > 0".to_string());
    }
    if config.providers.transcription.api_url.trim().is_empty() {
        errors.push("providers.transcription.api_url must not be empty".to_string());
    }

    if config.pdf.index_path.trim().is_empty() {
        errors.push("pdf.index_path must not be empty".to_string());
    }
    if config.pdf.chunk_size == 0 {
        errors.push("pdf.chunk_size must be > 0".to_string());
    }
    if config.pdf.chunk_overlap >= config.pdf.chunk_size {
        errors.push("pdf.chunk_overlap must be smaller than pdf.chunk_size".to_string());
    }
    if config.pdf.top_k == 0 {
        errors.push("pdf.top_k must be > 0".to_string());
    }

    if config.server.port == 0 {
        errors.push("server.port must be > 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut config = Config::default();
        config.chat_history_path = "  ".to_string();
        config.pdf.chunk_overlap = config.pdf.chunk_size;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("chat_history_path"));
        assert!(err.contains("chunk_overlap"));
    }
}
