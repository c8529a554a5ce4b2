use thiserror::Error;

/// Why a (content, provider) pair could not be turned into a stream descriptor
///
/// Every variant is handled by failing over to the next provider; none is
/// retried against the same provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Network/connection errors (timeout, connection refused, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the resolver service
    #[error("Resolver returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Body could not be parsed as a stream response
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Service answered `success: false`
    #[error("Provider failed: {0}")]
    Provider(String),

    /// Well-formed answer without a usable URL
    #[error("No playable stream")]
    NoPlayableStream,
}

impl ResolutionError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ResolutionError::Network(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            ResolutionError::Network(format!("Connection failed: {}", error))
        } else if error.is_decode() {
            ResolutionError::Malformed(error.to_string())
        } else {
            ResolutionError::Network(error.to_string())
        }
    }

    /// Create an error from an HTTP status code and response body.
    ///
    /// The service wraps failures as `{"error": "..."}`; that message is
    /// preferred over the raw body when present.
    pub fn from_status(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("error")
                    .and_then(|e| e.as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);

        ResolutionError::Status { status, message }
    }

    /// Short reason used in failure logs and the exhaustion message
    pub fn reason(&self) -> String {
        match self {
            ResolutionError::Network(msg) => format!("network: {}", msg),
            ResolutionError::Status { status, .. } => format!("HTTP {}", status),
            ResolutionError::Malformed(_) => "malformed response".to_string(),
            ResolutionError::Provider(msg) => msg.clone(),
            ResolutionError::NoPlayableStream => "no playable stream".to_string(),
        }
    }
}
