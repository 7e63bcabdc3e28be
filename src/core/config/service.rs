use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_settings;
use crate::core::errors::RagError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 1] = ["max_tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("REPAIR_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Raw merged configuration (public config overlaid with secrets).
    /// A missing file counts as empty; an unreadable or malformed one is an error.
    pub fn load_config(&self) -> Result<Value, RagError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Typed, validated settings with environment overrides applied and
    /// relative paths resolved against the project root.
    pub fn load_settings(&self) -> Result<Settings, RagError> {
        let merged = self.load_config()?;
        let settings: Settings = serde_json::from_value(merged)
            .map_err(|e| RagError::Configuration(format!("invalid config file: {}", e)))?;
        let settings = apply_env_overrides(settings).resolve_paths(&self.paths.project_root);

        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Configuration view safe for logging.
    pub fn redacted_config(&self) -> Result<Value, RagError> {
        Ok(redact_sensitive_values(&self.load_config()?))
    }
}

fn apply_env_overrides(mut settings: Settings) -> Settings {
    if let Ok(key) = env::var("OPENAI_API_KEY") {
        if !key.trim().is_empty() {
            settings.llm.api_key = Some(key);
        }
    }
    if let Ok(url) = env::var("REPAIR_LLM_BASE_URL") {
        if !url.trim().is_empty() {
            settings.llm.base_url = url;
        }
    }
    settings
}

fn load_yaml_file(path: &Path) -> Result<Value, RagError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        RagError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => Ok(value),
        // empty file
        Ok(Value::Null) => Ok(Value::Object(Map::new())),
        Ok(_) => Err(RagError::Configuration(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
        Err(e) => Err(RagError::Configuration(format!(
            "{} is not valid YAML: {}",
            path.display(),
            e
        ))),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &Path) -> ConfigService {
        ConfigService::new(Arc::new(AppPaths::with_dirs(
            dir.to_path_buf(),
            dir.join("user"),
        )))
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "chat_model": "gpt-4o", "max_tokens": 1000 },
            "retrieval": { "k_final": 4 }
        });
        let override_value = json!({
            "llm": { "api_key": "sk-test" },
            "retrieval": { "k_final": 3 }
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "llm": { "chat_model": "gpt-4o", "max_tokens": 1000, "api_key": "sk-test" },
                "retrieval": { "k_final": 3 }
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "sk-live", "max_tokens": 1000 }
        });

        assert_eq!(
            redact_sensitive_values(&input),
            json!({
                "llm": { "api_key": "****", "max_tokens": 1000 }
            })
        );
    }

    #[test]
    fn load_settings_merges_secrets_and_resolves_paths() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("config.yml"),
            "retrieval:\n  k_search: 8\ncorpus:\n  index_dir: store/idx\n",
        )
        .unwrap();
        let service = service_in(tmp.path());
        fs::write(service.secrets_path(), "llm:\n  api_key: sk-from-secrets\n").unwrap();

        let settings = service.load_settings().unwrap();

        assert_eq!(settings.retrieval.k_search, 8);
        assert_eq!(settings.corpus.index_dir, tmp.path().join("store/idx"));
        // OPENAI_API_KEY may be set in the environment running the tests.
        assert!(settings.llm.api_key.is_some());
    }

    #[test]
    fn malformed_config_file_is_reported_instead_of_defaulted() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("config.yml"),
            "retrieval:\n  k_search: 3\n  k_final: 2\ncorpus:\n  source_path: [unclosed\n",
        )
        .unwrap();

        let err = service_in(tmp.path()).load_settings().unwrap_err();
        match err {
            RagError::Configuration(msg) => assert!(msg.contains("config.yml")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_secrets_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        fs::write(service.secrets_path(), "- just\n- a list\n").unwrap();

        let err = service.load_settings().unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(service.redacted_config().is_err());
    }

    #[test]
    fn missing_and_empty_files_yield_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_in(tmp.path());
        assert_eq!(service.load_settings().unwrap().retrieval.k_search, 10);

        fs::write(tmp.path().join("config.yml"), "").unwrap();
        assert_eq!(service.load_settings().unwrap().retrieval.k_final, 4);
    }

    #[test]
    fn load_settings_rejects_invalid_retrieval_limits() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("config.yml"),
            "retrieval:\n  k_search: 3\n  k_final: 5\n",
        )
        .unwrap();

        let err = service_in(tmp.path()).load_settings().unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }
}
