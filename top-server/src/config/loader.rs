use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::ConfigError;

/// Prefix of the environment variables that override configuration keys.
pub(crate) const ENV_PREFIX: &str = "TOP_";

/// Load and parse a YAML file, merging its top-level keys into `values`.
///
/// A missing file is not an error.
pub(crate) fn load_yaml_file(path: &Path, values: &mut Mapping) -> Result<(), ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        load_yaml_str(&content, values).map_err(|e| match e {
            ConfigError::Load(msg) => ConfigError::Load(format!("{}: {msg}", path.display())),
            other => other,
        })?;
    }
    Ok(())
}

/// Parse a YAML document and merge its top-level keys into `values`.
pub(crate) fn load_yaml_str(content: &str, values: &mut Mapping) -> Result<(), ConfigError> {
    let yaml: Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    match yaml {
        Value::Mapping(map) => {
            values.extend(map);
            Ok(())
        }
        Value::Null => Ok(()),
        _ => Err(ConfigError::Load(
            "top-level YAML value must be a mapping".into(),
        )),
    }
}

/// Overlay `TOP_*` variables onto `values`.
///
/// `TOP_CLIENT_ID` sets `client_id`. Keys whose current value is a string
/// take the variable verbatim, list keys also accept comma-separated
/// items, and any other key reads it as a YAML scalar or
/// flow sequence so that numbers and lists keep their type.
pub(crate) fn overlay_env<I>(values: &mut Mapping, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (env_key, env_val) in vars {
        let Some(key) = env_key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key = Value::String(key.to_lowercase());
        if key.as_str() == Some(super::CONFIG_FILE_KEY) {
            continue;
        }
        let value = match values.get(&key) {
            Some(Value::String(_)) | None => Value::String(env_val),
            Some(Value::Sequence(_)) if !env_val.trim_start().starts_with('[') => {
                Value::Sequence(
                    env_val
                        .split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(|item| Value::String(item.to_string()))
                        .collect(),
                )
            }
            Some(_) => match serde_yaml::from_str::<Value>(&env_val) {
                Ok(parsed @ (Value::Number(_) | Value::Bool(_) | Value::Sequence(_))) => parsed,
                _ => Value::String(env_val),
            },
        };
        values.insert(key, value);
    }
}
