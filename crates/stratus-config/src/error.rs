use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Config file not found. Looked in:\n\
        - current directory: stratus.local.yaml, stratus.yaml\n\
        - ./.stratus/ directory\n\
        - ~/.config/stratus/stratus.yaml\n\
        Set STRATUS_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("Invalid duration '{0}': expected e.g. 45s, 10m, 1h30m")]
    InvalidDuration(String),

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
