//! EC2 API wrapper
//!
//! One method per control-plane call the sequence needs. Every created
//! resource is tagged at creation time through `TagSpecification`.

use crate::error::{AwsError, Result};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::client::Waiters;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{
    AvailabilityZone, DomainType, Filter, Image, InstanceType, IpPermission, IpRange,
    ResourceType, Tag, TagSpecification, UserIdGroupPair, Vpc, VpcCidrBlockStateCode,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::time::Duration;
use vpcflow_cloud::{
    ElasticIp, ImageInfo, ImageQuery, IngressRule, IngressSource, InstanceRequest,
    NatGatewayRequest, PROJECT_TAG, ResourceTags, RouteTarget, SecurityGroupRequest,
    SubnetRequest, VpcInfo,
};

/// Codes EC2 returns for a VPC id that does not resolve
const VPC_NOT_FOUND_CODES: [&str; 2] = ["InvalidVpcID.NotFound", "InvalidVpcID.Malformed"];

pub struct Ec2 {
    client: Client,
}

impl Ec2 {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<VpcInfo>> {
        tracing::debug!(vpc_id, "DescribeVpcs");
        let output = match self.client.describe_vpcs().vpc_ids(vpc_id).send().await {
            Ok(output) => output,
            Err(err) => {
                let err = AwsError::api("DescribeVpcs", err);
                if is_vpc_not_found(err.code()) {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        Ok(output.vpcs().first().map(|vpc| VpcInfo {
            vpc_id: vpc.vpc_id().unwrap_or(vpc_id).to_string(),
            cidr_blocks: vpc_cidr_blocks(vpc),
        }))
    }

    pub async fn available_zones(&self) -> Result<Vec<String>> {
        tracing::debug!("DescribeAvailabilityZones");
        let output = self
            .client
            .describe_availability_zones()
            .filters(filter("state", "available"))
            .send()
            .await
            .map_err(|e| AwsError::api("DescribeAvailabilityZones", e))?;

        Ok(zone_names(output.availability_zones()))
    }

    pub async fn create_subnet(&self, request: &SubnetRequest) -> Result<String> {
        tracing::debug!(
            cidr = %request.cidr_block,
            zone = %request.availability_zone,
            "CreateSubnet"
        );
        let output = self
            .client
            .create_subnet()
            .vpc_id(&request.vpc_id)
            .cidr_block(&request.cidr_block)
            .availability_zone(&request.availability_zone)
            .tag_specifications(tag_specification(ResourceType::Subnet, &request.tags))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateSubnet", e))?;

        output
            .subnet()
            .and_then(|subnet| subnet.subnet_id())
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "CreateSubnet",
                field: "subnet id",
            })
    }

    /// Gateway attached to the VPC, if any
    pub async fn find_internet_gateway(&self, vpc_id: &str) -> Result<Option<String>> {
        tracing::debug!(vpc_id, "DescribeInternetGateways");
        let output = self
            .client
            .describe_internet_gateways()
            .filters(filter("attachment.vpc-id", vpc_id))
            .send()
            .await
            .map_err(|e| AwsError::api("DescribeInternetGateways", e))?;

        Ok(output
            .internet_gateways()
            .iter()
            .find_map(|igw| igw.internet_gateway_id())
            .map(str::to_string))
    }

    pub async fn create_internet_gateway(&self, tags: &ResourceTags) -> Result<String> {
        tracing::debug!(name = %tags.name, "CreateInternetGateway");
        let output = self
            .client
            .create_internet_gateway()
            .tag_specifications(tag_specification(ResourceType::InternetGateway, tags))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateInternetGateway", e))?;

        output
            .internet_gateway()
            .and_then(|igw| igw.internet_gateway_id())
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "CreateInternetGateway",
                field: "internet gateway id",
            })
    }

    pub async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        tracing::debug!(gateway_id, vpc_id, "AttachInternetGateway");
        self.client
            .attach_internet_gateway()
            .internet_gateway_id(gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| AwsError::api("AttachInternetGateway", e))?;
        Ok(())
    }

    pub async fn create_route_table(&self, vpc_id: &str, tags: &ResourceTags) -> Result<String> {
        tracing::debug!(vpc_id, name = %tags.name, "CreateRouteTable");
        let output = self
            .client
            .create_route_table()
            .vpc_id(vpc_id)
            .tag_specifications(tag_specification(ResourceType::RouteTable, tags))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateRouteTable", e))?;

        output
            .route_table()
            .and_then(|rt| rt.route_table_id())
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "CreateRouteTable",
                field: "route table id",
            })
    }

    pub async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        tracing::debug!(route_table_id, destination_cidr, ?target, "CreateRoute");
        let request = self
            .client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr);
        let request = match target {
            RouteTarget::InternetGateway(id) => request.gateway_id(id),
            RouteTarget::NatGateway(id) => request.nat_gateway_id(id),
        };
        request
            .send()
            .await
            .map_err(|e| AwsError::api("CreateRoute", e))?;
        Ok(())
    }

    pub async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String> {
        tracing::debug!(route_table_id, subnet_id, "AssociateRouteTable");
        let output = self
            .client
            .associate_route_table()
            .route_table_id(route_table_id)
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(|e| AwsError::api("AssociateRouteTable", e))?;

        output
            .association_id()
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "AssociateRouteTable",
                field: "association id",
            })
    }

    pub async fn allocate_address(&self, tags: &ResourceTags) -> Result<ElasticIp> {
        tracing::debug!(name = %tags.name, "AllocateAddress");
        let output = self
            .client
            .allocate_address()
            .domain(DomainType::Vpc)
            .tag_specifications(tag_specification(ResourceType::ElasticIp, tags))
            .send()
            .await
            .map_err(|e| AwsError::api("AllocateAddress", e))?;

        let allocation_id = output
            .allocation_id()
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "AllocateAddress",
                field: "allocation id",
            })?;
        Ok(ElasticIp {
            allocation_id,
            public_ip: output.public_ip().map(str::to_string),
        })
    }

    pub async fn create_nat_gateway(&self, request: &NatGatewayRequest) -> Result<String> {
        tracing::debug!(
            subnet_id = %request.subnet_id,
            allocation_id = %request.allocation_id,
            "CreateNatGateway"
        );
        let output = self
            .client
            .create_nat_gateway()
            .subnet_id(&request.subnet_id)
            .allocation_id(&request.allocation_id)
            .tag_specifications(tag_specification(ResourceType::Natgateway, &request.tags))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateNatGateway", e))?;

        output
            .nat_gateway()
            .and_then(|nat| nat.nat_gateway_id())
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "CreateNatGateway",
                field: "NAT gateway id",
            })
    }

    pub async fn wait_nat_gateway_available(
        &self,
        nat_gateway_id: &str,
        max_wait: Duration,
    ) -> Result<()> {
        tracing::debug!(
            nat_gateway_id,
            max_wait_secs = max_wait.as_secs(),
            "Waiting for NAT gateway"
        );
        self.client
            .wait_until_nat_gateway_available()
            .nat_gateway_ids(nat_gateway_id)
            .wait(max_wait)
            .await
            .map_err(|e| AwsError::Wait {
                resource: nat_gateway_id.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    pub async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String> {
        tracing::debug!(group_name = %request.group_name, "CreateSecurityGroup");
        let output = self
            .client
            .create_security_group()
            .group_name(&request.group_name)
            .description(&request.description)
            .vpc_id(&request.vpc_id)
            .tag_specifications(tag_specification(ResourceType::SecurityGroup, &request.tags))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateSecurityGroup", e))?;

        output
            .group_id()
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "CreateSecurityGroup",
                field: "group id",
            })
    }

    pub async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()> {
        tracing::debug!(group_id, port = rule.port, "AuthorizeSecurityGroupIngress");
        self.client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(ip_permission(rule))
            .send()
            .await
            .map_err(|e| AwsError::api("AuthorizeSecurityGroupIngress", e))?;
        Ok(())
    }

    pub async fn find_latest_image(&self, query: &ImageQuery) -> Result<Option<ImageInfo>> {
        tracing::debug!(owner = %query.owner, name = %query.name_pattern, "DescribeImages");
        let output = self
            .client
            .describe_images()
            .owners(&query.owner)
            .filters(filter("name", &query.name_pattern))
            .filters(filter("state", "available"))
            .send()
            .await
            .map_err(|e| AwsError::api("DescribeImages", e))?;

        Ok(newest_image(output.images()).and_then(|image| {
            Some(ImageInfo {
                image_id: image.image_id()?.to_string(),
                name: image.name().map(str::to_string),
                creation_date: image.creation_date().map(str::to_string),
            })
        }))
    }

    pub async fn run_instance(&self, request: &InstanceRequest) -> Result<String> {
        tracing::debug!(
            image_id = %request.image_id,
            instance_type = %request.instance_type,
            subnet_id = %request.subnet_id,
            "RunInstances"
        );
        let output = self
            .client
            .run_instances()
            .image_id(&request.image_id)
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .min_count(1)
            .max_count(1)
            .subnet_id(&request.subnet_id)
            .security_group_ids(&request.security_group_id)
            .set_key_name(request.key_name.clone())
            .user_data(STANDARD.encode(&request.user_data))
            .tag_specifications(tag_specification(ResourceType::Instance, &request.tags))
            .send()
            .await
            .map_err(|e| AwsError::api("RunInstances", e))?;

        output
            .instances()
            .first()
            .and_then(|instance| instance.instance_id())
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "RunInstances",
                field: "instance id",
            })
    }

    pub async fn wait_instance_running(&self, instance_id: &str, max_wait: Duration) -> Result<()> {
        tracing::debug!(instance_id, max_wait_secs = max_wait.as_secs(), "Waiting for instance");
        self.client
            .wait_until_instance_running()
            .instance_ids(instance_id)
            .wait(max_wait)
            .await
            .map_err(|e| AwsError::Wait {
                resource: instance_id.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}

/// True for the error codes of a VPC id that does not resolve
pub(crate) fn is_vpc_not_found(code: Option<&str>) -> bool {
    code.is_some_and(|code| VPC_NOT_FOUND_CODES.contains(&code))
}

fn filter(name: &str, value: &str) -> Filter {
    Filter::builder().name(name).values(value).build()
}

/// `Name` and project tags for a resource created with `resource_type`
pub(crate) fn tag_specification(
    resource_type: ResourceType,
    tags: &ResourceTags,
) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key("Name").value(&tags.name).build())
        .tags(Tag::builder().key(PROJECT_TAG).value(&tags.project).build())
        .build()
}

/// Primary CIDR plus every associated secondary block
pub(crate) fn vpc_cidr_blocks(vpc: &Vpc) -> Vec<String> {
    let mut blocks: Vec<String> = vpc.cidr_block().map(str::to_string).into_iter().collect();

    let associated = vpc
        .cidr_block_association_set()
        .iter()
        .filter(|assoc| {
            assoc
                .cidr_block_state()
                .and_then(|state| state.state())
                .is_none_or(|state| *state == VpcCidrBlockStateCode::Associated)
        })
        .filter_map(|assoc| assoc.cidr_block());

    for cidr in associated {
        if !blocks.iter().any(|b| b == cidr) {
            blocks.push(cidr.to_string());
        }
    }
    blocks
}

/// Zone names sorted by name
pub(crate) fn zone_names(zones: &[AvailabilityZone]) -> Vec<String> {
    let mut names: Vec<String> = zones
        .iter()
        .filter_map(|zone| zone.zone_name())
        .map(str::to_string)
        .collect();
    names.sort();
    names
}

/// Most recently created image (creation dates are ISO 8601 strings)
pub(crate) fn newest_image(images: &[Image]) -> Option<&Image> {
    images
        .iter()
        .filter(|image| image.image_id().is_some())
        .max_by(|a, b| a.creation_date().cmp(&b.creation_date()))
}

pub(crate) fn ip_permission(rule: &IngressRule) -> IpPermission {
    let port = i32::from(rule.port);
    let permission = IpPermission::builder()
        .ip_protocol("tcp")
        .from_port(port)
        .to_port(port);

    match &rule.source {
        IngressSource::Cidr(cidr) => permission.ip_ranges(
            IpRange::builder()
                .cidr_ip(cidr)
                .description(&rule.description)
                .build(),
        ),
        IngressSource::SecurityGroup(group_id) => permission.user_id_group_pairs(
            UserIdGroupPair::builder()
                .group_id(group_id)
                .description(&rule.description)
                .build(),
        ),
    }
    .build()
}
