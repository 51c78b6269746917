use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlexaError {
    #[error("Not connected to Alexa - call /reconnect to establish a session")]
    NotConnected,

    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized - session cookie may be expired")]
    Unauthorized,

    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl AlexaError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        // Back up to a char boundary; localized bodies may put a multibyte
        // character across the cut
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => AlexaError::Unauthorized,
            code => AlexaError::Upstream {
                status: code,
                body: Self::truncate_body(body),
            },
        }
    }

    /// Whether the failure is the caller's fault (HTTP 400) rather than
    /// the bridge's or the upstream's (HTTP 500)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AlexaError::UnknownDevice(_)
                | AlexaError::UnknownCommand(_)
                | AlexaError::InvalidRequest(_)
        )
    }

    /// Short machine-readable label for the JSON error body
    pub fn kind(&self) -> &'static str {
        match self {
            AlexaError::NotConnected => "not-connected",
            AlexaError::NotAuthenticated(_) => "not-authenticated",
            AlexaError::UnknownDevice(_) => "unknown-device",
            AlexaError::UnknownCommand(_) => "unknown-command",
            AlexaError::InvalidRequest(_) => "invalid-request",
            AlexaError::Unauthorized => "unauthorized",
            AlexaError::Upstream { .. } => "upstream",
            AlexaError::Network(_) => "network",
            AlexaError::InvalidResponse(_) => "invalid-response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_401_is_unauthorized() {
        let err = AlexaError::from_status(reqwest::StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, AlexaError::Unauthorized));
    }

    #[test]
    fn test_from_status_truncates_long_bodies() {
        let body = "x".repeat(2000);
        let err = AlexaError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        match err {
            AlexaError::Upstream { status, body } => {
                assert_eq!(status, 500);
                assert!(body.len() < 600);
                assert!(body.contains("truncated"));
            }
            other => panic!("Unexpected error variant: {:?}", other),
        }
    }

    #[test]
    fn test_from_status_truncates_multibyte_bodies_at_char_boundary() {
        // Byte 500 lands inside the two-byte 'é'
        let body = format!("{}é{}", "x".repeat(499), "y".repeat(100));
        let err = AlexaError::from_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, &body);
        match err {
            AlexaError::Upstream { status, body } => {
                assert_eq!(status, 503);
                assert!(body.starts_with(&"x".repeat(499)));
                assert!(!body.contains('é'));
                assert!(body.contains("truncated, 601 total bytes"));
            }
            other => panic!("Unexpected error variant: {:?}", other),
        }
    }

    #[test]
    fn test_caller_error_classification() {
        assert!(AlexaError::UnknownCommand("dance".into()).is_caller_error());
        assert!(AlexaError::UnknownDevice("Attic".into()).is_caller_error());
        assert!(AlexaError::InvalidRequest("empty search phrase".into()).is_caller_error());
        assert!(!AlexaError::NotConnected.is_caller_error());
        assert!(!AlexaError::Unauthorized.is_caller_error());
    }
}
