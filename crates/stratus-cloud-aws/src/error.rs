use stratus_cloud::CloudError;
use thiserror::Error;

/// AWS provider errors
#[derive(Error, Debug)]
pub enum AwsError {
    #[error("{operation}: resource not found ({id})")]
    NotFound { operation: &'static str, id: String },

    #[error("{operation} failed: {message}")]
    Sdk {
        operation: &'static str,
        message: String,
    },

    #[error("Failed to build request: {0}")]
    Build(String),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl AwsError {
    pub(crate) fn build(e: impl std::fmt::Display) -> Self {
        AwsError::Build(e.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            AwsError::NotFound { .. } => true,
            AwsError::Cloud(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::NotFound { id, .. } => CloudError::ResourceNotFound(id),
            AwsError::Sdk { operation, message } => {
                CloudError::ApiError(format!("{operation}: {message}"))
            }
            AwsError::Build(msg) => CloudError::InvalidConfig(msg),
            AwsError::Cloud(e) => e,
        }
    }
}

pub type AwsResult<T> = Result<T, AwsError>;
