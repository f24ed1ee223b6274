use thiserror::Error;

#[derive(Debug, Error)]
pub enum MammoscanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input file: {0}")]
    InvalidFile(String),
}

pub type Result<T> = std::result::Result<T, MammoscanError>;
