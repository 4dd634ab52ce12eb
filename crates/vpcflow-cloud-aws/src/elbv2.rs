//! Elastic Load Balancing v2 API wrapper

use crate::error::{AwsError, Result};
use aws_sdk_elasticloadbalancingv2::Client;
use aws_sdk_elasticloadbalancingv2::types::{
    Action, ActionTypeEnum, LoadBalancerSchemeEnum, LoadBalancerTypeEnum, ProtocolEnum, Tag,
    TargetDescription, TargetTypeEnum,
};
use vpcflow_cloud::{
    ListenerRequest, LoadBalancerInfo, LoadBalancerRequest, PROJECT_TAG, ResourceTags,
    TargetGroupRequest,
};

pub struct LoadBalancing {
    client: Client,
}

impl LoadBalancing {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Internet-facing application load balancer
    pub async fn create_load_balancer(
        &self,
        request: &LoadBalancerRequest,
    ) -> Result<LoadBalancerInfo> {
        tracing::debug!(
            name = %request.name,
            subnets = ?request.subnet_ids,
            "CreateLoadBalancer"
        );
        let output = self
            .client
            .create_load_balancer()
            .name(&request.name)
            .set_subnets(Some(request.subnet_ids.clone()))
            .security_groups(&request.security_group_id)
            .scheme(LoadBalancerSchemeEnum::InternetFacing)
            .r#type(LoadBalancerTypeEnum::Application)
            .set_tags(Some(tags(&request.tags)?))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateLoadBalancer", e))?;

        let load_balancer = output
            .load_balancers()
            .first()
            .ok_or(AwsError::MissingField {
                operation: "CreateLoadBalancer",
                field: "load balancer",
            })?;
        let arn = load_balancer
            .load_balancer_arn()
            .ok_or(AwsError::MissingField {
                operation: "CreateLoadBalancer",
                field: "load balancer ARN",
            })?;
        let dns_name = load_balancer.dns_name().ok_or(AwsError::MissingField {
            operation: "CreateLoadBalancer",
            field: "DNS name",
        })?;

        Ok(LoadBalancerInfo {
            arn: arn.to_string(),
            dns_name: dns_name.to_string(),
        })
    }

    /// HTTP target group of instance targets
    pub async fn create_target_group(&self, request: &TargetGroupRequest) -> Result<String> {
        tracing::debug!(name = %request.name, port = request.port, "CreateTargetGroup");
        let output = self
            .client
            .create_target_group()
            .name(&request.name)
            .protocol(ProtocolEnum::Http)
            .port(i32::from(request.port))
            .vpc_id(&request.vpc_id)
            .target_type(TargetTypeEnum::Instance)
            .health_check_protocol(ProtocolEnum::Http)
            .health_check_path(&request.health_check_path)
            .set_tags(Some(tags(&request.tags)?))
            .send()
            .await
            .map_err(|e| AwsError::api("CreateTargetGroup", e))?;

        output
            .target_groups()
            .first()
            .and_then(|tg| tg.target_group_arn())
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "CreateTargetGroup",
                field: "target group ARN",
            })
    }

    pub async fn register_target(
        &self,
        target_group_arn: &str,
        instance_id: &str,
        port: u16,
    ) -> Result<()> {
        tracing::debug!(target_group_arn, instance_id, port, "RegisterTargets");
        let target = TargetDescription::builder()
            .id(instance_id)
            .port(i32::from(port))
            .build()?;
        self.client
            .register_targets()
            .target_group_arn(target_group_arn)
            .targets(target)
            .send()
            .await
            .map_err(|e| AwsError::api("RegisterTargets", e))?;
        Ok(())
    }

    /// HTTP listener forwarding everything to one target group
    pub async fn create_listener(&self, request: &ListenerRequest) -> Result<String> {
        tracing::debug!(port = request.port, "CreateListener");
        let output = self
            .client
            .create_listener()
            .load_balancer_arn(&request.load_balancer_arn)
            .protocol(ProtocolEnum::Http)
            .port(i32::from(request.port))
            .default_actions(forward_action(&request.target_group_arn)?)
            .send()
            .await
            .map_err(|e| AwsError::api("CreateListener", e))?;

        output
            .listeners()
            .first()
            .and_then(|listener| listener.listener_arn())
            .map(str::to_string)
            .ok_or(AwsError::MissingField {
                operation: "CreateListener",
                field: "listener ARN",
            })
    }
}

pub(crate) fn tags(tags: &ResourceTags) -> Result<Vec<Tag>> {
    Ok(vec![
        Tag::builder().key("Name").value(&tags.name).build()?,
        Tag::builder()
            .key(PROJECT_TAG)
            .value(&tags.project)
            .build()?,
    ])
}

pub(crate) fn forward_action(target_group_arn: &str) -> Result<Action> {
    Ok(Action::builder()
        .r#type(ActionTypeEnum::Forward)
        .target_group_arn(target_group_arn)
        .build()?)
}
