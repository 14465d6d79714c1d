use thiserror::Error;
use webpad_gateway::RemoteOperation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The remote store answered with a failure envelope, or could not be
    /// reached at all.
    #[error("{message}")]
    Remote {
        operation: RemoteOperation,
        message: String,
    },
}

impl SessionError {
    pub fn remote(operation: RemoteOperation, message: impl Into<String>) -> Self {
        SessionError::Remote {
            operation,
            message: message.into(),
        }
    }

    pub fn operation(&self) -> RemoteOperation {
        match self {
            SessionError::Remote { operation, .. } => *operation,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SessionError::Remote { message, .. } => message,
        }
    }
}
