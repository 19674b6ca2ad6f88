use thiserror::Error;

/// Failure of a call against the movie API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error: HTTP {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Missing field in response: {0}")]
    Missing(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Signup rejected: {0}")]
    SignupRejected(String),
}

impl ApiError {
    /// Text shown to the user in forms and the status bar.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(e) if e.is_timeout() => "The server took too long to answer".to_string(),
            ApiError::Transport(e) if e.is_connect() => "Could not reach the server".to_string(),
            ApiError::Transport(e) => format!("Network error: {}", e),
            ApiError::Status { status, message } => {
                if message.is_empty() {
                    format!("Server error ({})", status)
                } else {
                    format!("Server error ({}): {}", status, message)
                }
            }
            ApiError::Decode(_) => "Unexpected response from the server".to_string(),
            ApiError::Missing(what) => format!("Server response is missing {}", what),
            ApiError::InvalidCredentials => "Incorrect username or password".to_string(),
            ApiError::SignupRejected(detail) => detail.clone(),
        }
    }
}
