use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("backend returned {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("API key is required")]
    MissingApiKey,
    #[error("backend sent an empty reply")]
    EmptyResponse,
}

impl BackendError {
    /// Connection problems and server-side failures are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::RequestError(_) => true,
            BackendError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Text shown in place of the assistant reply when a request fails.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::RequestError(e) if e.is_connect() || e.is_timeout() => {
                "Could not reach the generation backend. Check that it is running and try again."
                    .to_string()
            }
            BackendError::RequestError(_) => {
                "The request to the generation backend failed. Please try again.".to_string()
            }
            BackendError::JsonError(_) => {
                "The generation backend sent a reply that could not be read.".to_string()
            }
            BackendError::ApiError { status, message } => {
                format!("The generation backend reported an error ({}): {}", status, message)
            }
            BackendError::MissingApiKey => {
                "No API key is configured. Set one with `trellis model-config --set-api-key <KEY>`."
                    .to_string()
            }
            BackendError::EmptyResponse => "The generation backend returned no text.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_readable() {
        let err = BackendError::ApiError {
            status: 400,
            message: "No API key provided".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "The generation backend reported an error (400): No API key provided"
        );
        assert!(BackendError::MissingApiKey.user_message().contains("model-config"));
        assert!(!err.is_retryable());
        assert!(!BackendError::MissingApiKey.is_retryable());
    }
}
