//! Configuration loading and management
//!
//! Precedence, lowest first: built-in defaults, `config.yaml`, API key
//! aliases (`OPENAI_API_KEY`, ...), then `MMCHAT__SECTION__FIELD` variables.

use super::schema::Config;
use super::validate::validate_config;
use crate::Error;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yaml";
const ENV_PREFIX: &str = "MMCHAT__";

/// Well-known variables and the config fields they fill
const ENV_ALIASES: &[(&str, &[&str])] = &[
    ("OPENAI_API_KEY", &["providers", "chat", "api_key"]),
    ("OPENAI_API_KEY", &["providers", "vision", "api_key"]),
    ("GROQ_API_KEY", &["providers", "transcription", "api_key"]),
    ("MMCHAT_CHAT_HISTORY_PATH", &["chat_history_path"]),
];

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader for `~/.mmchat`
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".mmchat"))
            .unwrap_or_else(|| PathBuf::from(".mmchat"));

        Self { config_dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load, merge and validate the configuration
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_env(std::env::vars())
    }

    /// Like [`ConfigLoader::load`], reading overrides from `vars` instead of
    /// the process environment
    pub fn load_with_env<I>(&self, vars: I) -> crate::Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tree = serde_json::to_value(Config::default()).map_err(config_error)?;

        if let Some(file_tree) = self.read_file()? {
            overlay(&mut tree, file_tree);
        }
        for (path, raw) in env_overrides(vars) {
            let value = typed_override(&tree, &path, raw);
            insert_at(&mut tree, &path, value);
        }

        let config: Config = serde_json::from_value(tree).map_err(config_error)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Write `config` as YAML, creating the directory if needed
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_yaml::to_string(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn read_file(&self) -> crate::Result<Option<Value>> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let tree: Value = serde_yaml::from_str(&content)?;
        // an empty file parses as null
        Ok(Some(tree).filter(|t| !t.is_null()))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn config_error(e: serde_json::Error) -> Error {
    Error::Config(e.to_string())
}

/// Deep-merge `top` into `base`; objects merge key by key, anything else
/// replaces
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Put `value` at `path`, replacing non-object intermediates with objects
fn insert_at(tree: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *tree = value;
        return;
    };
    if !tree.is_object() {
        *tree = Value::Object(Map::new());
    }
    if let Value::Object(map) = tree {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        insert_at(child, rest, value);
    }
}

/// Interpret an override for the field at `path`. Text fields take the raw
/// string; numbers, booleans and lists parse it as JSON, falling back to text.
fn typed_override(tree: &Value, path: &[String], raw: String) -> Value {
    let current = path.iter().try_fold(tree, |node, key| node.get(key));
    match current {
        None | Some(Value::Null) | Some(Value::String(_)) => Value::String(raw),
        Some(_) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
    }
}

/// Config paths and raw values named by environment variables, aliases
/// first
fn env_overrides<I>(vars: I) -> Vec<(Vec<String>, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: Vec<(String, String)> = vars.into_iter().collect();
    let mut overrides = Vec::new();

    for (name, path) in ENV_ALIASES {
        if let Some((_, value)) = vars.iter().find(|(key, _)| key.as_str() == *name) {
            let path = path.iter().map(|s| s.to_string()).collect();
            overrides.push((path, value.clone()));
        }
    }

    for (key, raw) in &vars {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if path.is_empty() {
            continue;
        }
        overrides.push((path, raw.clone()));
    }

    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            // SAFETY: tests serialize env mutations with ENV_LOCK.
            unsafe { std::env::set_var(key, value) };
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.original {
                // SAFETY: tests serialize env mutations with ENV_LOCK.
                Some(value) => unsafe { std::env::set_var(&self.key, value) },
                // SAFETY: as above.
                None => unsafe { std::env::remove_var(&self.key) },
            }
        }
    }

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(Vec::new())
            .unwrap();

        assert_eq!(config.chat_history_path, "chat_sessions/");
        assert_eq!(config.pdf.chunk_size, 1024);
        assert_eq!(config.server.port, 8501);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.yaml"),
            "chat_history_path: /tmp/chats/\npdf:\n  top_k: 5\n",
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(Vec::new())
            .unwrap();
        assert_eq!(config.chat_history_path, "/tmp/chats/");
        assert_eq!(config.pdf.top_k, 5);
        assert_eq!(config.pdf.chunk_overlap, 50);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.yaml"), "").unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(Vec::new())
            .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.providers.chat.model = "test-model".to_string();
        loader.save(&config).unwrap();

        let loaded = loader.load_with_env(Vec::new()).unwrap();
        assert_eq!(loaded.providers.chat.model, "test-model");
    }

    #[test]
    fn test_aliases_fill_api_keys() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(vars(&[
                ("OPENAI_API_KEY", "sk-openai-from-env"),
                ("GROQ_API_KEY", "gsk-from-env"),
                ("MMCHAT_CHAT_HISTORY_PATH", "/srv/chats"),
            ]))
            .unwrap();

        assert_eq!(config.providers.chat.api_key, "sk-openai-from-env");
        assert_eq!(config.providers.vision.api_key, "sk-openai-from-env");
        assert_eq!(config.providers.transcription.api_key, "gsk-from-env");
        assert_eq!(config.chat_history_path, "/srv/chats");
    }

    #[test]
    fn test_path_vars_beat_file_and_aliases() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.yaml"),
            "providers:\n  chat:\n    model: file-model\n",
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(vars(&[
                ("MMCHAT__SERVER__PORT", "9000"),
                ("MMCHAT__PROVIDERS__CHAT__MODEL", "local-model"),
                ("MMCHAT__PROVIDERS__CHAT__API_KEY", "sk-explicit"),
                ("OPENAI_API_KEY", "sk-alias"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.providers.chat.model, "local-model");
        assert_eq!(config.providers.chat.api_key, "sk-explicit");
    }

    #[test]
    fn test_numeric_looking_text_stays_text() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(vars(&[
                ("MMCHAT__PROVIDERS__CHAT__API_KEY", "12345"),
                ("MMCHAT__PROVIDERS__CHAT__MODEL", "true"),
                ("MMCHAT__SERVER__PORT", "9000"),
                ("MMCHAT__PROVIDERS__CHAT__TEMPERATURE", "0.5"),
            ]))
            .unwrap();
        assert_eq!(config.providers.chat.api_key, "12345");
        assert_eq!(config.providers.chat.model, "true");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.providers.chat.temperature, 0.5);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(vars(&[("MMCHAT__PROVIDERS__CHAT__TEMPERATURE", "2.5")]))
            .unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.yaml"), "pdf: [unclosed").unwrap();

        let err = ConfigLoader::with_dir(temp_dir.path())
            .load_with_env(Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_insert_at_replaces_scalars() {
        let mut tree = serde_json::json!({"server": 1});
        insert_at(&mut tree, &["server".into(), "port".into()], Value::from(80));
        assert_eq!(tree, serde_json::json!({"server": {"port": 80}}));
    }

    #[test]
    fn test_load_reads_process_env() {
        let _lock = lock_env();
        let _port = EnvVarGuard::set("MMCHAT__SERVER__PORT", "9123");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.server.port, 9123);
    }
}
