//! Error types for cfgsync-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from cfgsync-core
    #[error(transparent)]
    Core(#[from] cfgsync_core::Error),

    /// Error from cfgsync-fs
    #[error(transparent)]
    Fs(#[from] cfgsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON output could not be produced
    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_displays_message() {
        let error = CliError::user("2 items failed");
        assert_eq!(error.to_string(), "2 items failed");
    }

    #[test]
    fn core_errors_are_transparent() {
        let error: CliError = cfgsync_core::Error::NoBackups.into();
        assert_eq!(error.to_string(), cfgsync_core::Error::NoBackups.to_string());
    }
}
