//! The provisioning sequence
//!
//! Steps run strictly in plan order. The first failing call aborts the run;
//! nothing is rolled back, and the resources created so far are handed back
//! in [`ProvisionError`] so they can be cleaned up by hand.

use crate::error::{CloudError, Result};
use crate::plan::{Plan, ResourceKind, Step, StepId};
use crate::provider::{
    ImageQuery, IngressRule, IngressSource, InstanceRequest, ListenerRequest,
    LoadBalancerRequest, NatGatewayRequest, NetworkProvider, ResourceTags, RouteTarget,
    SecurityGroupRequest, SubnetRequest, TargetGroupRequest, VpcInfo,
};
use crate::report::{ProvisionReport, ProvisionedResource, endpoint_url};
use ipnetwork::Ipv4Network;
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use vpcflow_core::{ProvisionConfig, ZONE_COUNT, parse_cidr, render_user_data};

const ANYWHERE: &str = "0.0.0.0/0";
const SSH_PORT: u16 = 22;

/// Progress callbacks, invoked synchronously between API calls
pub trait ProvisionObserver: Send + Sync {
    fn step_started(&self, _step: &Step) {}

    fn step_completed(&self, _step: &Step, _resource: Option<&ProvisionedResource>) {}

    /// A conditional step that did not run (gateway already attached)
    fn step_skipped(&self, _step: &Step) {}

    fn step_failed(&self, _step: &Step, _error: &CloudError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProvisionObserver for NoopObserver {}

static NOOP: NoopObserver = NoopObserver;

/// A run that stopped at `step`
#[derive(Error, Debug)]
#[error("{step} failed: {source}")]
pub struct ProvisionError {
    pub step: StepId,

    pub source: CloudError,

    /// Resources created before the failure (reused ones excluded)
    pub created: Vec<ProvisionedResource>,
}

impl ProvisionError {
    /// Resources left behind by the failed run
    pub fn orphans(&self) -> &[ProvisionedResource] {
        &self.created
    }

    /// True when the run failed before creating anything
    pub fn is_clean(&self) -> bool {
        self.created.is_empty()
    }
}

struct RunState {
    current: StepId,
    report: ProvisionReport,
}

/// Drives a [`NetworkProvider`] through the plan for one configuration
pub struct Provisioner<'a, P: NetworkProvider + ?Sized> {
    provider: &'a P,
    config: &'a ProvisionConfig,
    plan: Plan,
    observer: &'a dyn ProvisionObserver,
}

impl<'a, P: NetworkProvider + ?Sized> Provisioner<'a, P> {
    pub fn new(provider: &'a P, config: &'a ProvisionConfig) -> Self {
        Self {
            provider,
            config,
            plan: Plan::for_config(config),
            observer: &NOOP,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ProvisionObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Execute every step. Stops at the first error.
    pub async fn run(&self) -> std::result::Result<ProvisionReport, ProvisionError> {
        let started = Instant::now();
        let mut state = RunState {
            current: StepId::RenderUserData,
            report: ProvisionReport::new(
                &self.config.project,
                self.provider.region(),
                &self.config.vpc_id,
            ),
        };

        tracing::info!(
            provider = self.provider.name(),
            region = self.provider.region(),
            vpc_id = %self.config.vpc_id,
            steps = self.plan.steps.len(),
            "Starting provisioning"
        );

        match self.execute(&mut state).await {
            Ok(()) => {
                let mut report = state.report;
                report.duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    resources = report.resources.len(),
                    duration_ms = report.duration_ms,
                    "Provisioning finished"
                );
                Ok(report)
            }
            Err(source) => {
                if let Some(step) = self.plan.step(state.current) {
                    self.observer.step_failed(step, &source);
                }
                tracing::error!(step = %state.current, error = %source, "Provisioning aborted");
                Err(ProvisionError {
                    step: state.current,
                    source,
                    created: state.report.created().cloned().collect(),
                })
            }
        }
    }

    async fn execute(&self, state: &mut RunState) -> Result<()> {
        let config = self.config;
        let provider = self.provider;

        // Preflight: nothing below creates a resource until the zones are known
        self.begin(state, StepId::RenderUserData);
        let user_data = match &config.region {
            Some(_) => render_user_data(config)?,
            // Templates see the region actually in use
            None => render_user_data(&ProvisionConfig {
                region: Some(provider.region().to_string()),
                ..config.clone()
            })?,
        };
        self.done(state, StepId::RenderUserData, None);

        self.begin(state, StepId::LookupVpc);
        let vpc = provider
            .find_vpc(&config.vpc_id)
            .await?
            .ok_or_else(|| CloudError::VpcNotFound(config.vpc_id.clone()))?;
        check_subnets_within_vpc(config, &vpc)?;
        self.done(state, StepId::LookupVpc, None);

        self.begin(state, StepId::LookupAvailabilityZones);
        let zones = self.resolve_zones().await?;
        let [zone_1, zone_2] = zones.as_slice() else {
            return Err(CloudError::InsufficientZones {
                region: provider.region().to_string(),
                found: zones.len(),
            });
        };
        state.report.availability_zones = zones.clone();
        self.done(state, StepId::LookupAvailabilityZones, None);

        let [public_cidr_1, public_cidr_2] = config.network.public_subnets.as_slice() else {
            return Err(CloudError::InvalidConfig(
                "exactly two public subnets are required".to_string(),
            ));
        };
        let [private_cidr_1, private_cidr_2] = config.network.private_subnets.as_slice() else {
            return Err(CloudError::InvalidConfig(
                "exactly two private subnets are required".to_string(),
            ));
        };

        // Subnets
        let public_1 = self
            .create_subnet(state, StepId::CreatePublicSubnet1, public_cidr_1, zone_1, "public-1")
            .await?;
        let public_2 = self
            .create_subnet(state, StepId::CreatePublicSubnet2, public_cidr_2, zone_2, "public-2")
            .await?;
        let private_1 = self
            .create_subnet(state, StepId::CreatePrivateSubnet1, private_cidr_1, zone_1, "private-1")
            .await?;
        let private_2 = self
            .create_subnet(state, StepId::CreatePrivateSubnet2, private_cidr_2, zone_2, "private-2")
            .await?;

        // Internet gateway
        self.begin(state, StepId::LookupInternetGateway);
        let existing = provider.find_internet_gateway(&config.vpc_id).await?;
        let gateway_id = match existing {
            Some(gateway_id) => {
                tracing::warn!(
                    gateway_id = %gateway_id,
                    vpc_id = %config.vpc_id,
                    "Internet gateway already attached, reusing it"
                );
                let resource =
                    ProvisionedResource::reused(ResourceKind::InternetGateway, &gateway_id);
                self.done(state, StepId::LookupInternetGateway, Some(resource));
                self.skip(StepId::CreateInternetGateway);
                self.skip(StepId::AttachInternetGateway);
                gateway_id
            }
            None => {
                self.done(state, StepId::LookupInternetGateway, None);

                self.begin(state, StepId::CreateInternetGateway);
                let tags = self.tags("igw");
                let gateway_id = provider.create_internet_gateway(&tags).await?;
                let resource = ProvisionedResource::new(ResourceKind::InternetGateway, &gateway_id)
                    .with_name(&tags.name);
                self.done(state, StepId::CreateInternetGateway, Some(resource));

                self.begin(state, StepId::AttachInternetGateway);
                provider
                    .attach_internet_gateway(&gateway_id, &config.vpc_id)
                    .await?;
                self.done(state, StepId::AttachInternetGateway, None);
                gateway_id
            }
        };

        // Public routing
        let public_rt = self
            .create_route_table(state, StepId::CreatePublicRouteTable, "public-rt")
            .await?;
        self.begin(state, StepId::CreatePublicDefaultRoute);
        provider
            .create_route(&public_rt, ANYWHERE, &RouteTarget::InternetGateway(gateway_id))
            .await?;
        self.done(state, StepId::CreatePublicDefaultRoute, None);
        self.associate(state, StepId::AssociatePublicSubnet1, &public_rt, &public_1)
            .await?;
        self.associate(state, StepId::AssociatePublicSubnet2, &public_rt, &public_2)
            .await?;

        // NAT gateway
        self.begin(state, StepId::AllocateElasticIp);
        let eip_tags = self.tags("nat-eip");
        let eip = provider.allocate_address(&eip_tags).await?;
        let mut resource = ProvisionedResource::new(ResourceKind::ElasticIp, &eip.allocation_id)
            .with_name(&eip_tags.name);
        if let Some(public_ip) = &eip.public_ip {
            resource = resource.with_attribute("public_ip", json!(public_ip));
        }
        self.done(state, StepId::AllocateElasticIp, Some(resource));

        self.begin(state, StepId::CreateNatGateway);
        let nat_tags = self.tags("nat");
        let nat_gateway_id = provider
            .create_nat_gateway(&NatGatewayRequest {
                subnet_id: public_1.clone(),
                allocation_id: eip.allocation_id.clone(),
                tags: nat_tags.clone(),
            })
            .await?;
        let resource = ProvisionedResource::new(ResourceKind::NatGateway, &nat_gateway_id)
            .with_name(&nat_tags.name)
            .with_attribute("subnet_id", json!(public_1));
        self.done(state, StepId::CreateNatGateway, Some(resource));

        self.begin(state, StepId::WaitNatGateway);
        provider
            .wait_nat_gateway_available(&nat_gateway_id, config.wait.nat_gateway())
            .await?;
        self.done(state, StepId::WaitNatGateway, None);

        // Private routing
        let private_rt = self
            .create_route_table(state, StepId::CreatePrivateRouteTable, "private-rt")
            .await?;
        self.begin(state, StepId::CreatePrivateDefaultRoute);
        provider
            .create_route(&private_rt, ANYWHERE, &RouteTarget::NatGateway(nat_gateway_id))
            .await?;
        self.done(state, StepId::CreatePrivateDefaultRoute, None);
        self.associate(state, StepId::AssociatePrivateSubnet1, &private_rt, &private_1)
            .await?;
        self.associate(state, StepId::AssociatePrivateSubnet2, &private_rt, &private_2)
            .await?;

        // Security groups
        let alb_sg = self
            .create_security_group(
                state,
                StepId::CreateAlbSecurityGroup,
                "alb-sg",
                format!("Load balancer for {}", config.project),
            )
            .await?;
        self.authorize(
            state,
            StepId::AuthorizeAlbIngress,
            &alb_sg,
            IngressRule {
                port: config.app.listener_port,
                source: IngressSource::Cidr(ANYWHERE.to_string()),
                description: "HTTP from anywhere".to_string(),
            },
        )
        .await?;

        let instance_sg = self
            .create_security_group(
                state,
                StepId::CreateInstanceSecurityGroup,
                "instance-sg",
                format!("Web instances for {}", config.project),
            )
            .await?;
        self.authorize(
            state,
            StepId::AuthorizeInstanceIngress,
            &instance_sg,
            IngressRule {
                port: config.app.port,
                source: IngressSource::SecurityGroup(alb_sg.clone()),
                description: "App traffic from the load balancer".to_string(),
            },
        )
        .await?;
        if let Some(ssh) = &config.ssh {
            self.authorize(
                state,
                StepId::AuthorizeSshIngress,
                &instance_sg,
                IngressRule {
                    port: SSH_PORT,
                    source: IngressSource::Cidr(ssh.allow_cidr.clone()),
                    description: "SSH".to_string(),
                },
            )
            .await?;
        }

        // Instance
        self.begin(state, StepId::LookupImage);
        let image_spec = &config.instance.image;
        let image = provider
            .find_latest_image(&ImageQuery {
                owner: image_spec.owner.clone(),
                name_pattern: image_spec.name.clone(),
            })
            .await?
            .ok_or_else(|| CloudError::ImageNotFound {
                owner: image_spec.owner.clone(),
                name: image_spec.name.clone(),
            })?;
        tracing::info!(image_id = %image.image_id, name = ?image.name, "Selected image");
        state.report.image_id = Some(image.image_id.clone());
        self.done(state, StepId::LookupImage, None);

        self.begin(state, StepId::LaunchInstance);
        let web_tags = self.tags("web");
        let instance_id = provider
            .run_instance(&InstanceRequest {
                image_id: image.image_id.clone(),
                instance_type: config.instance.instance_type.clone(),
                key_name: config.instance.key_name.clone(),
                subnet_id: private_1.clone(),
                security_group_id: instance_sg.clone(),
                user_data,
                tags: web_tags.clone(),
            })
            .await?;
        let resource = ProvisionedResource::new(ResourceKind::Instance, &instance_id)
            .with_name(&web_tags.name)
            .with_attribute("image_id", json!(image.image_id))
            .with_attribute("instance_type", json!(config.instance.instance_type))
            .with_attribute("subnet_id", json!(private_1));
        self.done(state, StepId::LaunchInstance, Some(resource));

        self.begin(state, StepId::WaitInstanceRunning);
        provider
            .wait_instance_running(&instance_id, config.wait.instance())
            .await?;
        self.done(state, StepId::WaitInstanceRunning, None);

        // Load balancer
        self.begin(state, StepId::CreateLoadBalancer);
        let alb_tags = self.tags("alb");
        let load_balancer = provider
            .create_load_balancer(&LoadBalancerRequest {
                name: alb_tags.name.clone(),
                subnet_ids: vec![public_1, public_2],
                security_group_id: alb_sg,
                tags: alb_tags.clone(),
            })
            .await?;
        let resource = ProvisionedResource::new(ResourceKind::LoadBalancer, &load_balancer.arn)
            .with_name(&alb_tags.name)
            .with_attribute("dns_name", json!(load_balancer.dns_name));
        state.report.load_balancer_dns = Some(load_balancer.dns_name.clone());
        self.done(state, StepId::CreateLoadBalancer, Some(resource));

        self.begin(state, StepId::CreateTargetGroup);
        let tg_tags = self.tags("tg");
        let target_group_arn = provider
            .create_target_group(&TargetGroupRequest {
                name: tg_tags.name.clone(),
                vpc_id: config.vpc_id.clone(),
                port: config.app.port,
                health_check_path: config.app.health_check_path.clone(),
                tags: tg_tags.clone(),
            })
            .await?;
        let resource = ProvisionedResource::new(ResourceKind::TargetGroup, &target_group_arn)
            .with_name(&tg_tags.name);
        self.done(state, StepId::CreateTargetGroup, Some(resource));

        self.begin(state, StepId::RegisterTarget);
        provider
            .register_target(&target_group_arn, &instance_id, config.app.port)
            .await?;
        self.done(state, StepId::RegisterTarget, None);

        self.begin(state, StepId::CreateListener);
        let listener_arn = provider
            .create_listener(&ListenerRequest {
                load_balancer_arn: load_balancer.arn.clone(),
                port: config.app.listener_port,
                target_group_arn,
            })
            .await?;
        let resource = ProvisionedResource::new(ResourceKind::Listener, &listener_arn)
            .with_attribute("port", json!(config.app.listener_port));
        self.done(state, StepId::CreateListener, Some(resource));

        state.report.endpoint = Some(endpoint_url(
            &load_balancer.dns_name,
            config.app.listener_port,
        ));
        Ok(())
    }

    /// Configured zones, or the first two available ones of the region
    async fn resolve_zones(&self) -> Result<Vec<String>> {
        if !self.config.network.zones.is_empty() {
            return Ok(self.config.network.zones.clone());
        }

        let mut zones = self.provider.availability_zones().await?;
        zones.sort();
        zones.truncate(ZONE_COUNT);
        Ok(zones)
    }

    async fn create_subnet(
        &self,
        state: &mut RunState,
        id: StepId,
        cidr: &str,
        zone: &str,
        role: &str,
    ) -> Result<String> {
        self.begin(state, id);
        let tags = self.tags(role);
        let subnet_id = self
            .provider
            .create_subnet(&SubnetRequest {
                vpc_id: self.config.vpc_id.clone(),
                cidr_block: cidr.to_string(),
                availability_zone: zone.to_string(),
                tags: tags.clone(),
            })
            .await?;
        let resource = ProvisionedResource::new(ResourceKind::Subnet, &subnet_id)
            .with_name(tags.name)
            .with_attribute("cidr", json!(cidr))
            .with_attribute("zone", json!(zone));
        self.done(state, id, Some(resource));
        Ok(subnet_id)
    }

    async fn create_route_table(
        &self,
        state: &mut RunState,
        id: StepId,
        role: &str,
    ) -> Result<String> {
        self.begin(state, id);
        let tags = self.tags(role);
        let route_table_id = self
            .provider
            .create_route_table(&self.config.vpc_id, &tags)
            .await?;
        let resource = ProvisionedResource::new(ResourceKind::RouteTable, &route_table_id)
            .with_name(tags.name);
        self.done(state, id, Some(resource));
        Ok(route_table_id)
    }

    async fn associate(
        &self,
        state: &mut RunState,
        id: StepId,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<()> {
        self.begin(state, id);
        let association_id = self
            .provider
            .associate_route_table(route_table_id, subnet_id)
            .await?;
        let resource = ProvisionedResource::new(ResourceKind::RouteTableAssociation, association_id)
            .with_attribute("route_table_id", json!(route_table_id))
            .with_attribute("subnet_id", json!(subnet_id));
        self.done(state, id, Some(resource));
        Ok(())
    }

    async fn create_security_group(
        &self,
        state: &mut RunState,
        id: StepId,
        role: &str,
        description: String,
    ) -> Result<String> {
        self.begin(state, id);
        let tags = self.tags(role);
        let group_id = self
            .provider
            .create_security_group(&SecurityGroupRequest {
                vpc_id: self.config.vpc_id.clone(),
                group_name: tags.name.clone(),
                description,
                tags: tags.clone(),
            })
            .await?;
        let resource =
            ProvisionedResource::new(ResourceKind::SecurityGroup, &group_id).with_name(tags.name);
        self.done(state, id, Some(resource));
        Ok(group_id)
    }

    async fn authorize(
        &self,
        state: &mut RunState,
        id: StepId,
        group_id: &str,
        rule: IngressRule,
    ) -> Result<()> {
        self.begin(state, id);
        self.provider.authorize_ingress(group_id, &rule).await?;
        self.done(state, id, None);
        Ok(())
    }

    fn tags(&self, role: &str) -> ResourceTags {
        ResourceTags::new(self.config.resource_name(role), &self.config.project)
    }

    fn begin(&self, state: &mut RunState, id: StepId) {
        state.current = id;
        tracing::debug!(step = %id, "Step started");
        if let Some(step) = self.plan.step(id) {
            self.observer.step_started(step);
        }
    }

    fn done(&self, state: &mut RunState, id: StepId, resource: Option<ProvisionedResource>) {
        if let Some(step) = self.plan.step(id) {
            self.observer.step_completed(step, resource.as_ref());
        }
        if let Some(resource) = resource {
            tracing::info!(
                step = %id,
                kind = ?resource.kind,
                id = %resource.id,
                reused = resource.reused,
                "Resource ready"
            );
            state.report.push(resource);
        }
    }

    fn skip(&self, id: StepId) {
        tracing::debug!(step = %id, "Step skipped");
        if let Some(step) = self.plan.step(id) {
            self.observer.step_skipped(step);
        }
    }
}

/// Every configured subnet must lie inside one of the VPC's CIDR blocks
fn check_subnets_within_vpc(config: &ProvisionConfig, vpc: &VpcInfo) -> Result<()> {
    let vpc_networks: Vec<Ipv4Network> = vpc
        .cidr_blocks
        .iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect();

    for cidr in config.network.all_subnets() {
        let subnet = parse_cidr(cidr)?;
        if !vpc_networks.iter().any(|vpc_net| subnet.is_subnet_of(*vpc_net)) {
            return Err(CloudError::SubnetOutsideVpc {
                cidr: cidr.clone(),
                vpc_cidrs: vpc.cidr_blocks.join(", "),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc(cidrs: &[&str]) -> VpcInfo {
        VpcInfo {
            vpc_id: "vpc-1".to_string(),
            cidr_blocks: cidrs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_subnets_fit_default_vpc() {
        let config = ProvisionConfig::default();
        assert!(check_subnets_within_vpc(&config, &vpc(&["10.0.0.0/16"])).is_ok());
    }

    #[test]
    fn test_subnet_outside_vpc() {
        let config = ProvisionConfig::default();
        let err = check_subnets_within_vpc(&config, &vpc(&["172.31.0.0/16"])).unwrap_err();
        match err {
            CloudError::SubnetOutsideVpc { cidr, vpc_cidrs } => {
                assert_eq!(cidr, "10.0.1.0/24");
                assert_eq!(vpc_cidrs, "172.31.0.0/16");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_secondary_cidr_block_counts() {
        let mut config = ProvisionConfig::default();
        config.network.private_subnets =
            vec!["100.64.1.0/24".to_string(), "100.64.2.0/24".to_string()];
        let result = check_subnets_within_vpc(&config, &vpc(&["10.0.0.0/16", "100.64.0.0/16"]));
        assert!(result.is_ok());
    }

    #[test]
    fn test_provision_error_orphans() {
        let err = ProvisionError {
            step: StepId::CreateTargetGroup,
            source: CloudError::ApiError("DuplicateTargetGroupName".to_string()),
            created: vec![ProvisionedResource::new(ResourceKind::Subnet, "subnet-1")],
        };
        assert!(!err.is_clean());
        assert_eq!(err.orphans().len(), 1);
        assert!(err.to_string().starts_with("create-target-group failed"));
    }
}
