use super::{config_path_from_env, default_global_config_path, ConfigError, ServerSettings};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSettings {
    pub settings: ServerSettings,
    /// File the settings were read from; `None` when built-in defaults apply.
    pub source: Option<PathBuf>,
}

/// Resolves settings from an explicit path, then `VF_REASONING_CONFIG`, then the
/// global config file. Explicitly named files must exist; a missing global file
/// falls back to defaults.
pub fn load_server_settings(explicit: Option<&Path>) -> Result<LoadedSettings, ConfigError> {
    if let Some(path) = explicit
        .map(Path::to_path_buf)
        .or_else(config_path_from_env)
    {
        if !path.is_file() {
            return Err(ConfigError::Missing {
                path: path.display().to_string(),
            });
        }
        return load_from(path);
    }

    let path = match default_global_config_path() {
        Ok(path) => path,
        Err(ConfigError::HomeDirectoryUnavailable) => return defaults(),
        Err(err) => return Err(err),
    };
    if !path.is_file() {
        return defaults();
    }
    load_from(path)
}

fn load_from(path: PathBuf) -> Result<LoadedSettings, ConfigError> {
    let settings = ServerSettings::from_path(&path)?;
    settings.validate()?;
    Ok(LoadedSettings {
        settings,
        source: Some(path),
    })
}

fn defaults() -> Result<LoadedSettings, ConfigError> {
    let settings = ServerSettings::default();
    settings.validate()?;
    Ok(LoadedSettings {
        settings,
        source: None,
    })
}
