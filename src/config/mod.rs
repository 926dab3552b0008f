pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::{load_server_settings, LoadedSettings};
pub use paths::{
    config_path_from_env, default_global_config_path, CONFIG_PATH_ENV, GLOBAL_SETTINGS_FILE_NAME,
    GLOBAL_STATE_DIR,
};
pub use settings::{
    LoggingSettings, SamplingSettings, ServerSettings, WorkflowSettings, DEFAULT_INITIAL_ANSWER,
    DEFAULT_INTELLIGENCE_PRIORITY, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_TOKENS,
    DEFAULT_SAMPLING_TIMEOUT_SECONDS, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
