//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("VPC not found: {0}. Check the VPC id and the region")]
    VpcNotFound(String),

    #[error("Region {region} has {found} available zone(s); 2 are required")]
    InsufficientZones { region: String, found: usize },

    #[error("Subnet {cidr} is outside the VPC CIDR block(s): {vpc_cidrs}")]
    SubnetOutsideVpc { cidr: String, vpc_cidrs: String },

    #[error("No image found for owner {owner} matching {name}")]
    ImageNotFound { owner: String, name: String },

    #[error("{operation} returned no {attribute}")]
    MissingAttribute {
        operation: String,
        attribute: &'static str,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<vpcflow_core::CoreError> for CloudError {
    fn from(err: vpcflow_core::CoreError) -> Self {
        CloudError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
