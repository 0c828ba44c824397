use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Entity '{entity}' with key [{key}] no longer exists")]
    NoLongerExists { entity: String, key: String },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl<T> From<std::sync::PoisonError<T>> for PersistenceError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl PersistenceError {
    /// True when the failure was raised before any request reached the store.
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InvalidState(_)
                | Self::Metadata(_)
                | Self::Configuration(_)
        )
    }
}
