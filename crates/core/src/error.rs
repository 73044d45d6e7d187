//! Error types for the EduPilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the orchestration layer
//! decides which of them are retried, absorbed, or surfaced.

use thiserror::Error;

/// The top-level error type for all EduPilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Content generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Orchestration errors ---
    #[error("Run error: {0}")]
    Run(#[from] RunError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The model refused on safety or policy grounds.
    #[error("Content rejected by provider policy: {0}")]
    ContentFiltered(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    ///
    /// Safety/policy rejections and auth failures are terminal; rate limits,
    /// timeouts, network faults and 5xx responses are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 408,
            Self::AuthenticationFailed(_) | Self::ContentFiltered(_) | Self::NotConfigured(_) => {
                false
            }
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// Writes are only allowed to the `ephemeral` and `hypothesis` layers.
    #[error("Invalid memory layer for writes: {layer}")]
    InvalidLayer { layer: String },
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Learner not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// A retryable upstream fault (timeout, rate limit, 5xx).
    #[error("Transient generation failure: {0}")]
    Transient(String),

    /// A non-retryable upstream rejection (safety/policy, auth).
    #[error("Generation rejected: {0}")]
    Terminal(String),

    /// Output could not be repaired into the expected shape.
    #[error("Malformed generation output: {0}")]
    Malformed(String),
}

impl GenerationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        if err.is_transient() {
            Self::Transient(err.to_string())
        } else {
            Self::Terminal(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonRepairError {
    #[error("No JSON content found")]
    Empty,

    #[error("JSON could not be repaired: {0}")]
    Unrecoverable(String),
}

#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("Model returned neither text nor tool calls")]
    EmptyResponse,

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Model call failed: {0}")]
    Model(#[from] ProviderError),
}

impl RunError {
    /// The message shown to callers; diagnostics stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Cancelled => "The request was cancelled.",
            Self::EmptyResponse | Self::Model(_) => {
                "Something went wrong while preparing today's learning. Please try again."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Timeout("slow".into()).is_transient());
        assert!(ProviderError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(
            ProviderError::ApiError { status_code: 503, message: String::new() }.is_transient()
        );
        assert!(
            !ProviderError::ApiError { status_code: 400, message: String::new() }.is_transient()
        );
        assert!(!ProviderError::ContentFiltered("unsafe".into()).is_transient());
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_transient());
    }

    #[test]
    fn generation_error_from_provider_keeps_class() {
        let transient: GenerationError = ProviderError::Network("reset".into()).into();
        assert!(transient.is_transient());
        let terminal: GenerationError = ProviderError::ContentFiltered("policy".into()).into();
        assert!(matches!(terminal, GenerationError::Terminal(_)));
    }

    #[test]
    fn invalid_layer_displays_layer() {
        let err = Error::Tool(ToolError::InvalidLayer { layer: "stable".into() });
        assert!(err.to_string().contains("stable"));
    }
}
