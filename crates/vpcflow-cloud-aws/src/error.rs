//! AWS provider error types

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;
use vpcflow_cloud::CloudError;

/// Error codes that mean the credentials are missing, expired or not allowed
const AUTH_ERROR_CODES: [&str; 5] = [
    "AuthFailure",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "ExpiredToken",
    "AccessDenied",
];

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        /// AWS error code (e.g., `InvalidGroup.Duplicate`)
        code: Option<String>,
        message: String,
    },

    #[error("{operation} response has no {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Waiting for {resource} failed: {message}")]
    Wait { resource: String, message: String },

    #[error("Invalid request: {0}")]
    Build(#[from] aws_sdk_elasticloadbalancingv2::error::BuildError),
}

impl AwsError {
    /// Wrap an SDK error, keeping the AWS error code
    pub fn api<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        Self::Api {
            operation,
            code: err.code().map(str::to_string),
            message: DisplayErrorContext(&err).to_string(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match &err {
            AwsError::Api {
                code: Some(code), ..
            } if AUTH_ERROR_CODES.contains(&code.as_str()) => {
                CloudError::AuthenticationFailed(err.to_string())
            }
            AwsError::MissingField { operation, field } => CloudError::MissingAttribute {
                operation: operation.to_string(),
                attribute: field,
            },
            AwsError::Wait { .. } => CloudError::Timeout(err.to_string()),
            _ => CloudError::ApiError(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
