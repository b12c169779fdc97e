// src/error.rs
//
// Error taxonomy for the pipeline. Input validation and decision-stage
// errors fail fast (caller bugs); intelligence errors other than missing
// credentials are recovered internally via the deterministic fallback and
// never surface to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid route '{route_id}': {reason}")]
    InvalidRoute { route_id: String, reason: String },

    #[error("no routes provided to the decision stage")]
    NoRoutesProvided,

    #[error("intelligence service credential is missing or empty")]
    MissingCredentials,

    #[error("configuration error: {0}")]
    Config(String),

    /// Only reachable when the fallback is disabled in configuration;
    /// otherwise intelligence failures degrade to fallback flags.
    #[error(transparent)]
    Intelligence(#[from] IntelligenceError),
}

/// Failures of the outbound intelligence call. All variants except
/// `MissingCredentials` are recovered via the fallback path.
#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error("intelligence service credential is missing or empty")]
    MissingCredentials,

    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl IntelligenceError {
    /// Whether the fallback path may absorb this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, IntelligenceError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_not_recoverable() {
        assert!(!IntelligenceError::MissingCredentials.is_recoverable());
        assert!(IntelligenceError::Service {
            status: 500,
            body: "oops".into()
        }
        .is_recoverable());
        assert!(
            IntelligenceError::MalformedResponse("bad json".into()).is_recoverable()
        );
    }
}
