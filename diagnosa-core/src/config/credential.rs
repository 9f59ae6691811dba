//! Startup resolution of the model credential.

use super::schema::Config;

/// Name of the single secret the process needs
pub const CREDENTIAL_NAME: &str = "GEMINI_API_KEY";

/// Resolve the Gemini API key from loaded configuration.
///
/// Surrounding whitespace and quotes (ASCII or typographic) are stripped,
/// since keys are often pasted from dashboards. A missing or blank key is
/// an [`Error::Credential`](crate::Error::Credential); callers treat it as
/// fatal.
pub fn resolve_credential(config: &Config) -> crate::Result<String> {
    let key = normalize_api_key(&config.providers.gemini.api_key);
    if key.is_empty() {
        return Err(crate::Error::Credential(format!(
            "{} tidak ditemukan! Atur variabel lingkungan {} atau providers.gemini.api_key di config.json.",
            CREDENTIAL_NAME, CREDENTIAL_NAME
        )));
    }
    Ok(key)
}

fn normalize_api_key(raw: &str) -> String {
    fn is_quote_char(c: char) -> bool {
        matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’')
    }

    raw.trim()
        .trim_matches(is_quote_char)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: &str) -> Config {
        let mut config = Config::default();
        config.providers.gemini.api_key = key.to_string();
        config
    }

    #[test]
    fn test_missing_key_is_credential_error() {
        let err = resolve_credential(&Config::default()).unwrap_err();
        assert!(matches!(err, crate::Error::Credential(_)));
        assert!(err.to_string().contains(CREDENTIAL_NAME));
    }

    #[test]
    fn test_blank_key_is_credential_error() {
        assert!(resolve_credential(&config_with_key("   ")).is_err());
        assert!(resolve_credential(&config_with_key("\"\"")).is_err());
    }

    #[test]
    fn test_key_is_normalized() {
        let key = resolve_credential(&config_with_key("  “AIzaSyABC”\n")).unwrap();
        assert_eq!(key, "AIzaSyABC");
    }
}
