use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrowthError {
    #[error("Invalid configuration: {parameter} {reason}")]
    InvalidConfiguration {
        parameter: &'static str,
        reason: String,
    },

    #[error("Feature store has no geometry, cannot derive a grid extent")]
    EmptyExtent,

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GrowthError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        GrowthError::InvalidConfiguration {
            parameter,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GrowthError>;
