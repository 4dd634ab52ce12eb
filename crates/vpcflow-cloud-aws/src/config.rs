//! SDK configuration loading

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Used when neither the flag, the config file nor the environment names a region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Load the shared SDK configuration
///
/// An explicit region wins; otherwise the SDK's default chain (`AWS_REGION`,
/// profile) is consulted before falling back to [`DEFAULT_REGION`].
/// Credentials always come from the default provider chain.
pub async fn load_sdk_config(region: Option<String>) -> SdkConfig {
    let region_provider = RegionProviderChain::first_try(region.map(Region::new))
        .or_default_provider()
        .or_else(Region::from_static(DEFAULT_REGION));

    aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await
}

/// Region name of a loaded configuration
pub fn region_name(config: &SdkConfig) -> String {
    config
        .region()
        .map(|region| region.to_string())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}
