//! Configuration validation rules.

use super::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let chat = &config.chat;
    if chat.placeholder_title.trim().is_empty() {
        errors.push("chat.placeholder_title must not be empty".to_string());
    }
    if chat.canned_reply.trim().is_empty() {
        errors.push("chat.canned_reply must not be empty".to_string());
    }
    // truncate() needs room for the "..." suffix
    if chat.preview_len < 4 {
        errors.push("chat.preview_len must be >= 4".to_string());
    }
    if chat.title_len < 4 {
        errors.push("chat.title_len must be >= 4".to_string());
    }
    if chat.models.is_empty() {
        errors.push("chat.models must list at least one model".to_string());
    } else if !chat.models.iter().any(|m| m == &chat.default_model) {
        errors.push(format!(
            "chat.default_model '{}' is not in chat.models",
            chat.default_model
        ));
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(format!(
            "logging.level must be one of {}",
            LOG_LEVELS.join(", ")
        ));
    }
    match config.logging.format.to_ascii_lowercase().as_str() {
        "text" | "json" => {}
        _ => errors.push("logging.format must be 'text' or 'json'".to_string()),
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
        config.chat.placeholder_title = "  ".into();
        config.chat.default_model = "Mystery".into();
        config.logging.format = "xml".into();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("placeholder_title"));
        assert!(err.contains("Mystery"));
        assert!(err.contains("logging.format"));
    }

    #[test]
    fn test_rejects_empty_model_list() {
        let mut config = Config::default();
        config.chat.models.clear();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("chat.models"));
    }
}
