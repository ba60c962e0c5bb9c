use thiserror::Error;

#[derive(Debug, Error)]
pub enum RtError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Could not read translation table {path}: {source}")]
    TranslationIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Translation table {path} is malformed: {source}")]
    TranslationParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid language code `{0}`. 無効な言語コードです。")]
    InvalidLanguageCode(String),

    #[error("No view item with callback `{0}` was found")]
    CallbackNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RtError {
    /// Whether the error is the invoker's fault and should be reported back verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RtError::InvalidLanguageCode(_)
                | RtError::CallbackNotFound(_)
                | RtError::Configuration(_)
                | RtError::TranslationIo { .. }
                | RtError::TranslationParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RtError>;
