//! Network provider trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tag key carrying the project name on every created resource
pub const PROJECT_TAG: &str = "vpcflow:project";

/// Control-plane operations the provisioning sequence needs
///
/// Each call maps to one provider API request. Implementations must not retry
/// or roll back; the caller aborts on the first error.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws")
    fn name(&self) -> &str;

    /// Region the provider is bound to
    fn region(&self) -> &str;

    /// `None` when the VPC does not exist
    async fn find_vpc(&self, vpc_id: &str) -> Result<Option<VpcInfo>>;

    /// Available zone names of the region, sorted by name
    async fn availability_zones(&self) -> Result<Vec<String>>;

    /// Returns the subnet id
    async fn create_subnet(&self, request: &SubnetRequest) -> Result<String>;

    /// Gateway currently attached to the VPC, if any
    async fn find_internet_gateway(&self, vpc_id: &str) -> Result<Option<String>>;

    async fn create_internet_gateway(&self, tags: &ResourceTags) -> Result<String>;

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()>;

    async fn create_route_table(&self, vpc_id: &str, tags: &ResourceTags) -> Result<String>;

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()>;

    /// Returns the association id
    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str)
    -> Result<String>;

    async fn allocate_address(&self, tags: &ResourceTags) -> Result<ElasticIp>;

    async fn create_nat_gateway(&self, request: &NatGatewayRequest) -> Result<String>;

    async fn wait_nat_gateway_available(&self, nat_gateway_id: &str, max_wait: Duration)
    -> Result<()>;

    /// Returns the security group id
    async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String>;

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()>;

    /// Newest available image matching the query
    async fn find_latest_image(&self, query: &ImageQuery) -> Result<Option<ImageInfo>>;

    /// Returns the instance id
    async fn run_instance(&self, request: &InstanceRequest) -> Result<String>;

    async fn wait_instance_running(&self, instance_id: &str, max_wait: Duration) -> Result<()>;

    async fn create_load_balancer(&self, request: &LoadBalancerRequest)
    -> Result<LoadBalancerInfo>;

    /// Returns the target group ARN
    async fn create_target_group(&self, request: &TargetGroupRequest) -> Result<String>;

    async fn register_target(
        &self,
        target_group_arn: &str,
        instance_id: &str,
        port: u16,
    ) -> Result<()>;

    /// Returns the listener ARN
    async fn create_listener(&self, request: &ListenerRequest) -> Result<String>;
}

/// Tags applied to a created resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTags {
    /// `Name` tag
    pub name: String,

    /// Value of [`PROJECT_TAG`]
    pub project: String,
}

impl ResourceTags {
    pub fn new(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcInfo {
    pub vpc_id: String,

    /// Primary and associated IPv4 CIDR blocks
    pub cidr_blocks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRequest {
    pub vpc_id: String,
    pub cidr_block: String,
    pub availability_zone: String,
    pub tags: ResourceTags,
}

/// Where a route sends traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    InternetGateway(String),
    NatGateway(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticIp {
    pub allocation_id: String,
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatGatewayRequest {
    pub subnet_id: String,
    pub allocation_id: String,
    pub tags: ResourceTags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupRequest {
    pub vpc_id: String,
    pub group_name: String,
    pub description: String,
    pub tags: ResourceTags,
}

/// Source of an ingress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressSource {
    Cidr(String),
    SecurityGroup(String),
}

/// Single-port TCP ingress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub port: u16,
    pub source: IngressSource,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub owner: String,
    /// Name pattern, `*` wildcards allowed
    pub name_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub image_id: String,
    pub name: Option<String>,
    pub creation_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: Option<String>,
    pub subnet_id: String,
    pub security_group_id: String,
    /// Plain text; the provider handles any encoding
    pub user_data: String,
    pub tags: ResourceTags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerRequest {
    pub name: String,
    pub subnet_ids: Vec<String>,
    pub security_group_id: String,
    pub tags: ResourceTags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerInfo {
    pub arn: String,
    pub dns_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroupRequest {
    pub name: String,
    pub vpc_id: String,
    pub port: u16,
    pub health_check_path: String,
    pub tags: ResourceTags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRequest {
    pub load_balancer_arn: String,
    pub port: u16,
    pub target_group_arn: String,
}
