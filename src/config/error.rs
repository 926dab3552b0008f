#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to encode settings as yaml: {source}")]
    Encode {
        #[source]
        source: serde_yaml::Error,
    },
    #[error("config file {path} does not exist")]
    Missing { path: String },
    #[error("settings validation failed: {0}")]
    Settings(String),
    #[error("failed to resolve home directory for global config path")]
    HomeDirectoryUnavailable,
}
