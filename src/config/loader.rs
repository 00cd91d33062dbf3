use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

const DEFAULT_TOML: &str = "hoststat.toml";
const DEFAULT_JSON: &str = "hoststat.json";

/// Loads a configuration file from the provided path or default locations.
///
/// # Errors
///
/// Returns an error when no config file exists or it cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> AppResult<ConfigFile> {
    if let Some(path) = path {
        let path = PathBuf::from(path);
        return load_config_file(&path);
    }

    let toml_path = PathBuf::from(DEFAULT_TOML);
    if toml_path.exists() {
        return load_config_file(&toml_path);
    }

    let json_path = PathBuf::from(DEFAULT_JSON);
    if json_path.exists() {
        return load_config_file(&json_path);
    }

    Err(AppError::config(ConfigError::NotFound))
}

pub(crate) fn load_config_file(path: &Path) -> AppResult<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some("json") => serde_json::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some(ext) => Err(AppError::config(ConfigError::UnsupportedExtension {
            ext: ext.to_owned(),
        })),
        None => Err(AppError::config(ConfigError::MissingExtension)),
    }
}
