//! Cloud provider error types

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Empty result from {0}")]
    EmptyResult(String),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error("{action} {resource} ({id}): {source}")]
    Operation {
        action: OperationAction,
        resource: &'static str,
        id: String,
        #[source]
        source: Box<CloudError>,
    },
}

impl CloudError {
    /// Wrap an error with the lifecycle step and resource it happened in.
    pub fn operation(
        action: OperationAction,
        resource: &'static str,
        id: impl Into<String>,
        source: CloudError,
    ) -> Self {
        CloudError::Operation {
            action,
            resource,
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// True if the resource is gone, looking through operation wrappers.
    pub fn is_not_found(&self) -> bool {
        match self {
            CloudError::ResourceNotFound(_) => true,
            CloudError::Operation { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// The waiter failure behind this error, if any.
    pub fn wait_error(&self) -> Option<&WaitError> {
        match self {
            CloudError::Wait(e) => Some(e),
            CloudError::Operation { source, .. } => source.wait_error(),
            _ => None,
        }
    }
}

/// Lifecycle step an operation error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationAction {
    Creating,
    Reading,
    Updating,
    Deleting,
    WaitingForCreation,
    WaitingForUpdate,
    WaitingForDeletion,
}

impl fmt::Display for OperationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationAction::Creating => write!(f, "creating"),
            OperationAction::Reading => write!(f, "reading"),
            OperationAction::Updating => write!(f, "updating"),
            OperationAction::Deleting => write!(f, "deleting"),
            OperationAction::WaitingForCreation => write!(f, "waiting for creation of"),
            OperationAction::WaitingForUpdate => write!(f, "waiting for update of"),
            OperationAction::WaitingForDeletion => write!(f, "waiting for deletion of"),
        }
    }
}

/// Terminal failures of the state-transition waiter
///
/// Statuses are carried as strings so the error is independent of the
/// resource's own status enum.
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("couldn't find resource ({checks} retries)")]
    NotFoundExhausted {
        checks: u32,
        last_status: Option<String>,
    },

    #[error(
        "unexpected state '{status}', wanted {}{}",
        wanted(.expected),
        .message.as_deref().map(|m| format!(". last error: {m}")).unwrap_or_default()
    )]
    UnexpectedState {
        status: String,
        expected: Vec<String>,
        message: Option<String>,
    },

    #[error(
        "timeout while waiting for {} (last state: '{}', timeout: {timeout:?})",
        awaited(.expected),
        .last_status.as_deref().unwrap_or("")
    )]
    Timeout {
        timeout: Duration,
        last_status: Option<String>,
        expected: Vec<String>,
    },

    #[error(
        "wait cancelled (last state: '{}')",
        .last_status.as_deref().unwrap_or("")
    )]
    Cancelled { last_status: Option<String> },

    #[error(transparent)]
    Poll(Box<CloudError>),
}

/// An empty target set means the waiter was waiting for the resource to disappear.
fn wanted(expected: &[String]) -> String {
    if expected.is_empty() {
        "the resource to be gone".to_string()
    } else {
        format!("target '{}'", expected.join(", "))
    }
}

fn awaited(expected: &[String]) -> String {
    if expected.is_empty() {
        "the resource to be gone".to_string()
    } else {
        format!("state to become '{}'", expected.join(", "))
    }
}

impl WaitError {
    /// Last status observed before the waiter gave up.
    pub fn last_status(&self) -> Option<&str> {
        match self {
            WaitError::NotFoundExhausted { last_status, .. }
            | WaitError::Timeout { last_status, .. }
            | WaitError::Cancelled { last_status } => last_status.as_deref(),
            WaitError::UnexpectedState { status, .. } => Some(status),
            WaitError::Poll(_) => None,
        }
    }

    /// Attach a remote status message to an unexpected-state failure.
    pub fn with_status_message(self, remote: Option<String>) -> Self {
        match self {
            WaitError::UnexpectedState {
                status,
                expected,
                message,
            } => WaitError::UnexpectedState {
                status,
                expected,
                message: remote.or(message),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
