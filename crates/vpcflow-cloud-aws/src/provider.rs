//! AWS implementation of `NetworkProvider`

use crate::config::region_name;
use crate::ec2::Ec2;
use crate::elbv2::LoadBalancing;
use async_trait::async_trait;
use aws_config::SdkConfig;
use std::time::Duration;
use vpcflow_cloud::{
    ElasticIp, ImageInfo, ImageQuery, IngressRule, InstanceRequest, ListenerRequest,
    LoadBalancerInfo, LoadBalancerRequest, NatGatewayRequest, NetworkProvider, ResourceTags,
    Result, RouteTarget, SecurityGroupRequest, SubnetRequest, TargetGroupRequest, VpcInfo,
};

/// EC2 + ELBv2 backed provider bound to one region
pub struct AwsNetworkProvider {
    ec2: Ec2,
    elbv2: LoadBalancing,
    region: String,
}

impl AwsNetworkProvider {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            ec2: Ec2::new(aws_sdk_ec2::Client::new(config)),
            elbv2: LoadBalancing::new(aws_sdk_elasticloadbalancingv2::Client::new(config)),
            region: region_name(config),
        }
    }
}

#[async_trait]
impl NetworkProvider for AwsNetworkProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn find_vpc(&self, vpc_id: &str) -> Result<Option<VpcInfo>> {
        Ok(self.ec2.describe_vpc(vpc_id).await?)
    }

    async fn availability_zones(&self) -> Result<Vec<String>> {
        Ok(self.ec2.available_zones().await?)
    }

    async fn create_subnet(&self, request: &SubnetRequest) -> Result<String> {
        Ok(self.ec2.create_subnet(request).await?)
    }

    async fn find_internet_gateway(&self, vpc_id: &str) -> Result<Option<String>> {
        Ok(self.ec2.find_internet_gateway(vpc_id).await?)
    }

    async fn create_internet_gateway(&self, tags: &ResourceTags) -> Result<String> {
        Ok(self.ec2.create_internet_gateway(tags).await?)
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        Ok(self.ec2.attach_internet_gateway(gateway_id, vpc_id).await?)
    }

    async fn create_route_table(&self, vpc_id: &str, tags: &ResourceTags) -> Result<String> {
        Ok(self.ec2.create_route_table(vpc_id, tags).await?)
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        Ok(self
            .ec2
            .create_route(route_table_id, destination_cidr, target)
            .await?)
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        Ok(self
            .ec2
            .associate_route_table(route_table_id, subnet_id)
            .await?)
    }

    async fn allocate_address(&self, tags: &ResourceTags) -> Result<ElasticIp> {
        Ok(self.ec2.allocate_address(tags).await?)
    }

    async fn create_nat_gateway(&self, request: &NatGatewayRequest) -> Result<String> {
        Ok(self.ec2.create_nat_gateway(request).await?)
    }

    async fn wait_nat_gateway_available(
        &self,
        nat_gateway_id: &str,
        max_wait: Duration,
    ) -> Result<()> {
        Ok(self
            .ec2
            .wait_nat_gateway_available(nat_gateway_id, max_wait)
            .await?)
    }

    async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String> {
        Ok(self.ec2.create_security_group(request).await?)
    }

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()> {
        Ok(self.ec2.authorize_ingress(group_id, rule).await?)
    }

    async fn find_latest_image(&self, query: &ImageQuery) -> Result<Option<ImageInfo>> {
        Ok(self.ec2.find_latest_image(query).await?)
    }

    async fn run_instance(&self, request: &InstanceRequest) -> Result<String> {
        Ok(self.ec2.run_instance(request).await?)
    }

    async fn wait_instance_running(&self, instance_id: &str, max_wait: Duration) -> Result<()> {
        Ok(self.ec2.wait_instance_running(instance_id, max_wait).await?)
    }

    async fn create_load_balancer(
        &self,
        request: &LoadBalancerRequest,
    ) -> Result<LoadBalancerInfo> {
        Ok(self.elbv2.create_load_balancer(request).await?)
    }

    async fn create_target_group(&self, request: &TargetGroupRequest) -> Result<String> {
        Ok(self.elbv2.create_target_group(request).await?)
    }

    async fn register_target(
        &self,
        target_group_arn: &str,
        instance_id: &str,
        port: u16,
    ) -> Result<()> {
        Ok(self
            .elbv2
            .register_target(target_group_arn, instance_id, port)
            .await?)
    }

    async fn create_listener(&self, request: &ListenerRequest) -> Result<String> {
        Ok(self.elbv2.create_listener(request).await?)
    }
}
