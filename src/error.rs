use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("API request failed: {status_text} ({status})")]
    Upstream { status: u16, status_text: String },

    #[error("task {id} not found")]
    NotFound { id: u64 },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not read TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("could not write TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
