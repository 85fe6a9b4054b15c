use super::DashboardId;

/// Failure of the query executor. Shown to the user only as a generic
/// message; the detail goes to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    Unreachable(String),
    Timeout,
    Rejected(String),
    Decode(String),
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorError::Unreachable(msg) => write!(f, "query executor unreachable: {msg}"),
            ExecutorError::Timeout => write!(f, "query timed out"),
            ExecutorError::Rejected(msg) => write!(f, "query rejected: {msg}"),
            ExecutorError::Decode(msg) => write!(f, "malformed query response: {msg}"),
        }
    }
}

impl std::error::Error for ExecutorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    NotFound(DashboardId),
    Unreachable(String),
    Rejected(String),
    Io(String),
    Decode(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::NotFound(id) => write!(f, "dashboard {id} not found"),
            PersistenceError::Unreachable(msg) => write!(f, "dashboard store unreachable: {msg}"),
            PersistenceError::Rejected(msg) => write!(f, "dashboard store rejected request: {msg}"),
            PersistenceError::Io(msg) => write!(f, "dashboard store i/o error: {msg}"),
            PersistenceError::Decode(msg) => write!(f, "malformed dashboard document: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Failure of an analytics or export call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    Unreachable(String),
    Rejected(String),
    Decode(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Unreachable(msg) => write!(f, "analytics service unreachable: {msg}"),
            ServiceError::Rejected(msg) => write!(f, "analytics request rejected: {msg}"),
            ServiceError::Decode(msg) => write!(f, "malformed analytics response: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Decode(err.to_string())
    }
}
