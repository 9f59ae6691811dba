//! Configuration loading and management

use super::credential::CREDENTIAL_NAME;
use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const ENV_PREFIX: &str = "DIAGNOSA__";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".diagnosa"))
            .unwrap_or_else(|| PathBuf::from(".diagnosa"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_env(std::env::vars())
    }

    fn load_with_env<I>(&self, vars: I) -> crate::Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_env_overrides(&mut merged, vars);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_value, overlay_value) => *base_value = overlay_value,
    }
}

/// Apply `GEMINI_API_KEY` and then `DIAGNOSA__SECTION__FIELD` overrides.
///
/// Path overrides win over the alias regardless of iteration order.
fn apply_env_overrides<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut alias = None;
    let mut paths = Vec::new();

    for (key, raw) in vars {
        if key == CREDENTIAL_NAME {
            alias = Some(raw);
        } else if let Some(suffix) = key.strip_prefix(ENV_PREFIX) {
            let path: Vec<String> = suffix
                .split("__")
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();
            if !path.is_empty() {
                paths.push((path, raw));
            }
        }
    }

    if let Some(key) = alias {
        set_path(config, &["providers", "gemini", "api_key"], Value::String(key));
    }
    for (path, raw) in paths {
        let value = env_value(path.last().map(String::as_str), raw);
        let path: Vec<&str> = path.iter().map(String::as_str).collect();
        set_path(config, &path, value);
    }
}

/// Credentials stay strings even when they look like JSON numbers
fn env_value(field: Option<&str>, raw: String) -> Value {
    if field == Some("api_key") {
        return Value::String(raw);
    }
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn set_path(node: &mut Value, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        set_path(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn load(temp_dir: &TempDir, env: &[(&str, &str)]) -> crate::Result<Config> {
        ConfigLoader::with_dir(temp_dir.path()).load_with_env(vars(env))
    }

    #[test]
    fn test_load_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = load(&temp_dir, &[]).unwrap();

        assert_eq!(config.model.name, "gemini-1.5-flash");
        assert_eq!(config.model.max_output_tokens, 500);
        assert!((config.model.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.gateway.session_idle_secs, 1800);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.ui.title = "Klinik".to_string();

        loader.save(&config).unwrap();
        let loaded = loader.load_with_env(Vec::new()).unwrap();

        assert_eq!(loaded.ui.title, "Klinik");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        std::fs::write(loader.config_path(), r#"{"gateway":{"port":9000}}"#).unwrap();

        let config = load(&temp_dir, &[]).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.model.name, "gemini-1.5-flash");
    }

    #[test]
    fn test_load_applies_alias_env_override() {
        let temp_dir = TempDir::new().unwrap();
        let config = load(&temp_dir, &[("GEMINI_API_KEY", "AIza-from-env")]).unwrap();

        assert_eq!(config.providers.gemini.api_key, "AIza-from-env");
    }

    #[test]
    fn test_load_applies_path_env_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config = load(
            &temp_dir,
            &[
                ("DIAGNOSA__MODEL__NAME", "gemini-1.5-pro"),
                ("DIAGNOSA__MODEL__TEMPERATURE", "0.9"),
                ("DIAGNOSA__GATEWAY__PORT", "9100"),
                ("DIAGNOSA__GATEWAY__SESSION_IDLE_SECS", "0"),
                ("UNRELATED", "x"),
            ],
        )
        .unwrap();

        assert_eq!(config.model.name, "gemini-1.5-pro");
        assert!((config.model.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.gateway.session_idle(), None);
    }

    #[test]
    fn test_path_env_overrides_alias_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        std::fs::write(
            loader.config_path(),
            r#"{"providers":{"gemini":{"api_key":"file-key"}}}"#,
        )
        .unwrap();

        // Path override listed first still wins over the alias.
        let config = load(
            &temp_dir,
            &[
                ("DIAGNOSA__PROVIDERS__GEMINI__API_KEY", "12345"),
                ("GEMINI_API_KEY", "alias-key"),
            ],
        )
        .unwrap();
        assert_eq!(config.providers.gemini.api_key, "12345");
    }

    #[test]
    fn test_validation_rejects_invalid_temperature() {
        let temp_dir = TempDir::new().unwrap();
        let err = load(&temp_dir, &[("DIAGNOSA__MODEL__TEMPERATURE", "2.5")]).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_invalid_json_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        std::fs::write(loader.config_path(), "{not json").unwrap();

        assert!(matches!(
            loader.load_with_env(Vec::new()),
            Err(crate::Error::Serialization(_))
        ));
    }
}
