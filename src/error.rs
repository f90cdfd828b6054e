use serde_json::Value;
use thiserror::Error;

/// Deployment-time failures, raised at construction before any network
/// or crypto work.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("unknown environment {0:?}, expected \"live\", \"sandbox\" or \"test\"")]
    UnknownEnvironment(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Per-call failures. Operations never panic on transport trouble; every
/// failure mode is one of these variants.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request timed out")]
    Timeout,

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The gateway answered with a non-2xx status. `body` is the server's
    /// response body, parsed as JSON when it is JSON.
    #[error("gateway rejected request with status {status}")]
    RemoteRejected { status: u16, body: Value },

    #[error("token encryption failed: {0}")]
    Token(String),

    #[error("service provider code must not be empty")]
    EmptyServiceProviderCode,

    #[error("transport failure: {0}")]
    Unknown(String),
}
