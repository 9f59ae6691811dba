//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.model.name.trim().is_empty() {
        errors.push("model.name must not be empty".to_string());
    }
    if !(0.0..=2.0).contains(&config.model.temperature) {
        errors.push("model.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.model.max_output_tokens == 0 {
        errors.push("model.max_output_tokens must be > 0".to_string());
    }
    if config.model.timeout_secs == 0 {
        errors.push("model.timeout_secs must be > 0".to_string());
    }

    if config.persona.priming_question.trim().is_empty() {
        errors.push("persona.priming_question must not be empty".to_string());
    }
    if config.persona.priming_ack.trim().is_empty() {
        errors.push("persona.priming_ack must not be empty".to_string());
    }

    if config.ui.title.trim().is_empty() {
        errors.push("ui.title must not be empty".to_string());
    }

    if config.gateway.host.trim().is_empty() {
        errors.push("gateway.host must not be empty".to_string());
    }
    if config.gateway.port == 0 {
        errors.push("gateway.port must be > 0".to_string());
    }

    if let Some(base) = &config.providers.gemini.api_base {
        let base = base.trim();
        if !base.is_empty() && !base.starts_with("http://") && !base.starts_with("https://") {
            errors.push("providers.gemini.api_base must be an http(s) URL".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Config(errors.join("; ")))
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
        config.model.max_output_tokens = 0;
        config.gateway.port = 0;
        config.persona.priming_ack = "  ".to_string();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("model.max_output_tokens"));
        assert!(err.contains("gateway.port"));
        assert!(err.contains("persona.priming_ack"));
    }

    #[test]
    fn test_rejects_non_http_api_base() {
        let mut config = Config::default();
        config.providers.gemini.api_base = Some("ftp://example.com".to_string());
        assert!(validate_config(&config).is_err());
    }
}
