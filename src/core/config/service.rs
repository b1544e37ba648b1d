use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;

/// Loads the merged application configuration.
///
/// Public settings live in `config.yml`; credentials (API keys) live in
/// `secrets.yml` inside the data directory and are deep-merged on top.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("FLEETWORTHY_CONFIG_PATH") {
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

    pub fn load_config(&self) -> Value {
        let public_config = match load_yaml_file(&self.config_path()) {
            Some(value) => value,
            None => default_config(),
        };
        let secrets_config =
            load_yaml_file(&self.secrets_path()).unwrap_or_else(|| Value::Object(Map::new()));
        deep_merge(&public_config, &secrets_config)
    }
}

/// Reads a non-empty string at a dotted path like `"llm.api_key"`.
pub fn config_str<'a>(config: &'a Value, path: &str) -> Option<&'a str> {
    let mut current = config;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    current.as_str().map(str::trim).filter(|s| !s.is_empty())
}

pub fn config_usize(config: &Value, path: &str, default: usize) -> usize {
    let mut current = config;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(value) => current = value,
            None => return default,
        }
    }
    current.as_u64().map(|v| v as usize).unwrap_or(default)
}

fn load_yaml_file(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }

    let contents = fs::read_to_string(path).ok()?;
    match serde_yaml::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Some(Value::Object(map)),
        _ => None,
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
