use thiserror::Error;

#[derive(Debug, Error)]
pub enum DepgateError {
    #[error("no credential configured: set DEPGATE_TOKEN")]
    CredentialMissing,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DepgateError>;

/// Failure of a single call to the remote validation service.
///
/// Only [`TransportError::Unreachable`] is treated as a connectivity problem;
/// everything else is an ordinary server or protocol failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("validation service unreachable: {0}")]
    Unreachable(String),

    #[error("unexpected response code: {status}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// True when the failure means "could not reach the service at all"
    /// (connection refused, DNS failure, timeout, network unreachable).
    pub fn is_connectivity(&self) -> bool {
        matches!(self, TransportError::Unreachable(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            TransportError::Unreachable(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unreachable_is_connectivity() {
        assert!(TransportError::Unreachable("refused".into()).is_connectivity());
        assert!(!TransportError::Status {
            status: 503,
            body: String::new()
        }
        .is_connectivity());
        assert!(!TransportError::Decode("eof".into()).is_connectivity());
        assert!(!TransportError::Other("boom".into()).is_connectivity());
    }

    #[test]
    fn status_message_names_code() {
        let e = TransportError::Status {
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(e.to_string(), "unexpected response code: 500");
    }
}
