//! AWS network provider for vpcflow
//!
//! Implements `NetworkProvider` on top of the AWS SDK (`aws-sdk-ec2` for the
//! network, NAT and instance, `aws-sdk-elasticloadbalancingv2` for the load
//! balancer).
//!
//! # Requirements
//!
//! - Credentials resolvable through the AWS default provider chain
//!   (environment, profile, SSO, instance metadata)
//!
//! # Example
//!
//! ```ignore
//! use vpcflow_cloud::Provisioner;
//! use vpcflow_cloud_aws::{AwsNetworkProvider, load_sdk_config};
//!
//! let sdk_config = load_sdk_config(config.region.clone()).await;
//! let provider = AwsNetworkProvider::new(&sdk_config);
//! let report = Provisioner::new(&provider, &config).run().await?;
//! println!("{}", report.endpoint.unwrap_or_default());
//! ```

pub mod config;
pub mod ec2;
pub mod elbv2;
pub mod error;
pub mod provider;

pub use config::{DEFAULT_REGION, load_sdk_config, region_name};
pub use error::{AwsError, Result};
pub use provider::AwsNetworkProvider;
