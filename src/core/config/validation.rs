use super::settings::Settings;
use crate::core::errors::RagError;

pub fn validate_settings(settings: &Settings) -> Result<(), RagError> {
    let retrieval = &settings.retrieval;
    if retrieval.k_search == 0 {
        return Err(config_error("retrieval.k_search", "must be at least 1"));
    }
    if retrieval.k_final == 0 || retrieval.k_final > retrieval.k_search {
        return Err(config_error(
            "retrieval.k_final",
            &format!("must be between 1 and k_search ({})", retrieval.k_search),
        ));
    }

    let llm = &settings.llm;
    validate_non_empty("llm.base_url", &llm.base_url)?;
    validate_non_empty("llm.chat_model", &llm.chat_model)?;
    validate_non_empty("llm.embedding_model", &llm.embedding_model)?;
    if llm.max_tokens == 0 {
        return Err(config_error("llm.max_tokens", "must be greater than 0"));
    }
    if llm.timeout_secs == 0 {
        return Err(config_error("llm.timeout_secs", "must be greater than 0"));
    }

    if settings.corpus.embed_batch_size == 0 {
        return Err(config_error(
            "corpus.embed_batch_size",
            "must be greater than 0",
        ));
    }
    if settings.corpus.index_dir.as_os_str().is_empty() {
        return Err(config_error("corpus.index_dir", "must not be empty"));
    }

    Ok(())
}

fn validate_non_empty(path: &str, value: &str) -> Result<(), RagError> {
    if value.trim().is_empty() {
        return Err(config_error(path, "must not be empty"));
    }
    Ok(())
}

fn config_error(path: &str, message: &str) -> RagError {
    RagError::Configuration(format!("{} {}", path, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn k_final_above_k_search_is_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.k_final = 11;
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("retrieval.k_final"));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut settings = Settings::default();
        settings.corpus.embed_batch_size = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn blank_model_name_is_rejected() {
        let mut settings = Settings::default();
        settings.llm.embedding_model = "  ".to_string();
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("llm.embedding_model"));
    }
}
