use crate::credentials::CredentialsFormatError;
use std::fmt;

/// Why a load failed. Each variant is terminal for the request.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorError {
    /// The submitted credentials are not a usable token blob
    InvalidCredentials(String),
    /// The provider rejected the token (expired, revoked, or missing scope)
    Auth(String),
    /// The provider is throttling us
    RateLimited(String),
    /// Network failure, unexpected status, or a response we could not parse
    Upstream(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::InvalidCredentials(msg)
            | ConnectorError::Auth(msg)
            | ConnectorError::RateLimited(msg)
            | ConnectorError::Upstream(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl From<CredentialsFormatError> for ConnectorError {
    fn from(err: CredentialsFormatError) -> Self {
        ConnectorError::InvalidCredentials(err.to_string())
    }
}
