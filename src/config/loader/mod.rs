use crate::config::Config;
use crate::utils::{atomic_write, ensure_dir, get_bondvoyage_home};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_bondvoyage_home()?.join("config.json"))
}

/// Load the config file (or defaults when it does not exist), then apply
/// environment overrides.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let mut config = read_config_file(config_path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

fn read_config_file(config_path: Option<&Path>) -> Result<Config> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    if !path.exists() {
        debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let data: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;
    let data = migrate_config(data);

    let config: Config =
        serde_json::from_value(data).with_context(|| "Failed to deserialize config")?;
    Ok(config)
}

/// Older configs kept the poll settings under a top-level `polling` key.
fn migrate_config(data: Value) -> Value {
    let Value::Object(mut map) = data else {
        return data;
    };
    if let Some(Value::Object(polling)) = map.remove("polling") {
        let chat = map
            .entry("chat".to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(chat_map) = chat {
            for (old, new) in [("intervalMs", "pollIntervalMs"), ("limit", "pollLimit")] {
                if let Some(v) = polling.get(old)
                    && !chat_map.contains_key(new)
                {
                    chat_map.insert(new.to_string(), v.clone());
                }
            }
        }
    }
    Value::Object(map)
}

pub fn save_config(config: &Config, config_path: Option<&Path>) -> Result<()> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    ensure_dir(path.parent().context("Config path has no parent")?)?;

    let content = serde_json::to_string_pretty(config)?;
    atomic_write(path, &content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    // Restrict permissions (best-effort, may fail on Windows)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }

    Ok(())
}
