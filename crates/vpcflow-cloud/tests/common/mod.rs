use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vpcflow_cloud::{
    CloudError, ElasticIp, ImageInfo, ImageQuery, IngressRule, IngressSource, InstanceRequest,
    ListenerRequest, LoadBalancerInfo, LoadBalancerRequest, NatGatewayRequest, NetworkProvider,
    ResourceTags, Result, RouteTarget, SecurityGroupRequest, SubnetRequest, TargetGroupRequest,
    VpcInfo,
};
use vpcflow_core::ProvisionConfig;

/// In-memory provider that records every call
///
/// Group, load balancer and target group names are unique like the real API,
/// and a created gateway stays attached across runs.
pub struct MockProvider {
    calls: Mutex<Vec<String>>,
    vpc: Option<VpcInfo>,
    zones: Vec<String>,
    image: Option<ImageInfo>,
    attached_gateway: Mutex<Option<String>>,
    names: Mutex<HashSet<String>>,
    fail_at: Option<&'static str>,
    counter: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            vpc: Some(VpcInfo {
                vpc_id: "vpc-test".to_string(),
                cidr_blocks: vec!["10.0.0.0/16".to_string()],
            }),
            zones: vec![
                "us-east-1b".to_string(),
                "us-east-1a".to_string(),
                "us-east-1c".to_string(),
            ],
            image: Some(ImageInfo {
                image_id: "ami-test".to_string(),
                name: Some("amzn2-ami-hvm-2.0.20240101-x86_64-gp2".to_string()),
                creation_date: Some("2024-01-01T00:00:00.000Z".to_string()),
            }),
            attached_gateway: Mutex::new(None),
            names: Mutex::new(HashSet::new()),
            fail_at: None,
            counter: AtomicUsize::new(1),
        }
    }

    pub fn without_vpc(mut self) -> Self {
        self.vpc = None;
        self
    }

    pub fn with_vpc_cidrs(mut self, cidrs: &[&str]) -> Self {
        self.vpc = Some(VpcInfo {
            vpc_id: "vpc-test".to_string(),
            cidr_blocks: cidrs.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_zones(mut self, zones: &[&str]) -> Self {
        self.zones = zones.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_gateway(self, gateway_id: &str) -> Self {
        *self.attached_gateway.lock().unwrap() = Some(gateway_id.to_string());
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = None;
        self
    }

    /// Make the named operation fail
    pub fn failing_at(mut self, operation: &'static str) -> Self {
        self.fail_at = Some(operation);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Operation names in call order
    pub fn operations(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.split_whitespace().next().unwrap_or_default().to_string())
            .collect()
    }

    /// Calls that create something remotely
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("find_") && !c.starts_with("availability_zones"))
            .collect()
    }

    fn call(&self, operation: &str, detail: impl std::fmt::Display) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", operation, detail).trim_end().to_string());
        if self.fail_at == Some(operation) {
            return Err(CloudError::ApiError(format!("{}: injected failure", operation)));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{:04}", prefix, self.counter.fetch_add(1, Ordering::SeqCst))
    }

    fn claim_name(&self, name: &str, code: &str) -> Result<()> {
        if !self.names.lock().unwrap().insert(name.to_string()) {
            return Err(CloudError::ApiError(format!("{}: {} already exists", code, name)));
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn region(&self) -> &str {
        "us-east-1"
    }

    async fn find_vpc(&self, vpc_id: &str) -> Result<Option<VpcInfo>> {
        self.call("find_vpc", vpc_id)?;
        Ok(self.vpc.clone())
    }

    async fn availability_zones(&self) -> Result<Vec<String>> {
        self.call("availability_zones", "")?;
        Ok(self.zones.clone())
    }

    async fn create_subnet(&self, request: &SubnetRequest) -> Result<String> {
        self.call(
            "create_subnet",
            format!("{} {} {}", request.cidr_block, request.availability_zone, request.tags.name),
        )?;
        Ok(self.next_id("subnet"))
    }

    async fn find_internet_gateway(&self, vpc_id: &str) -> Result<Option<String>> {
        self.call("find_internet_gateway", vpc_id)?;
        Ok(self.attached_gateway.lock().unwrap().clone())
    }

    async fn create_internet_gateway(&self, tags: &ResourceTags) -> Result<String> {
        self.call("create_internet_gateway", &tags.name)?;
        Ok(self.next_id("igw"))
    }

    async fn attach_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        self.call("attach_internet_gateway", format!("{} {}", gateway_id, vpc_id))?;
        *self.attached_gateway.lock().unwrap() = Some(gateway_id.to_string());
        Ok(())
    }

    async fn create_route_table(&self, _vpc_id: &str, tags: &ResourceTags) -> Result<String> {
        self.call("create_route_table", &tags.name)?;
        Ok(self.next_id("rtb"))
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        let target = match target {
            RouteTarget::InternetGateway(id) | RouteTarget::NatGateway(id) => id,
        };
        self.call(
            "create_route",
            format!("{} {} {}", route_table_id, destination_cidr, target),
        )
    }

    async fn associate_route_table(&self, route_table_id: &str, subnet_id: &str) -> Result<String> {
        self.call("associate_route_table", format!("{} {}", route_table_id, subnet_id))?;
        Ok(self.next_id("rtbassoc"))
    }

    async fn allocate_address(&self, tags: &ResourceTags) -> Result<ElasticIp> {
        self.call("allocate_address", &tags.name)?;
        Ok(ElasticIp {
            allocation_id: self.next_id("eipalloc"),
            public_ip: Some("198.51.100.7".to_string()),
        })
    }

    async fn create_nat_gateway(&self, request: &NatGatewayRequest) -> Result<String> {
        self.call(
            "create_nat_gateway",
            format!("{} {}", request.subnet_id, request.allocation_id),
        )?;
        Ok(self.next_id("nat"))
    }

    async fn wait_nat_gateway_available(
        &self,
        nat_gateway_id: &str,
        max_wait: Duration,
    ) -> Result<()> {
        self.call(
            "wait_nat_gateway_available",
            format!("{} {}", nat_gateway_id, max_wait.as_secs()),
        )
    }

    async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String> {
        self.call("create_security_group", &request.group_name)?;
        self.claim_name(&request.group_name, "InvalidGroup.Duplicate")?;
        Ok(self.next_id("sg"))
    }

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()> {
        let source = match &rule.source {
            IngressSource::Cidr(cidr) => cidr,
            IngressSource::SecurityGroup(group) => group,
        };
        self.call(
            "authorize_ingress",
            format!("{} {} {}", group_id, rule.port, source),
        )
    }

    async fn find_latest_image(&self, query: &ImageQuery) -> Result<Option<ImageInfo>> {
        self.call("find_latest_image", format!("{} {}", query.owner, query.name_pattern))?;
        Ok(self.image.clone())
    }

    async fn run_instance(&self, request: &InstanceRequest) -> Result<String> {
        self.call(
            "run_instance",
            format!(
                "{} {} {} {}",
                request.image_id,
                request.instance_type,
                request.subnet_id,
                request.security_group_id
            ),
        )?;
        Ok(self.next_id("i"))
    }

    async fn wait_instance_running(&self, instance_id: &str, max_wait: Duration) -> Result<()> {
        self.call(
            "wait_instance_running",
            format!("{} {}", instance_id, max_wait.as_secs()),
        )
    }

    async fn create_load_balancer(
        &self,
        request: &LoadBalancerRequest,
    ) -> Result<LoadBalancerInfo> {
        self.call(
            "create_load_balancer",
            format!("{} {}", request.name, request.subnet_ids.join(",")),
        )?;
        self.claim_name(&request.name, "DuplicateLoadBalancerName")?;
        let id = self.next_id("lb");
        Ok(LoadBalancerInfo {
            arn: format!(
                "arn:aws:elasticloadbalancing:us-east-1:123456789012:loadbalancer/app/{}",
                id
            ),
            dns_name: format!("{}-{}.us-east-1.elb.amazonaws.com", request.name, id),
        })
    }

    async fn create_target_group(&self, request: &TargetGroupRequest) -> Result<String> {
        self.call(
            "create_target_group",
            format!("{} {} {}", request.name, request.port, request.health_check_path),
        )?;
        self.claim_name(&request.name, "DuplicateTargetGroupName")?;
        Ok(format!(
            "arn:aws:elasticloadbalancing:us-east-1:123456789012:targetgroup/{}",
            self.next_id("tg")
        ))
    }

    async fn register_target(
        &self,
        target_group_arn: &str,
        instance_id: &str,
        port: u16,
    ) -> Result<()> {
        self.call(
            "register_target",
            format!("{} {} {}", target_group_arn, instance_id, port),
        )
    }

    async fn create_listener(&self, request: &ListenerRequest) -> Result<String> {
        self.call(
            "create_listener",
            format!("{} {}", request.port, request.target_group_arn),
        )?;
        Ok(format!(
            "arn:aws:elasticloadbalancing:us-east-1:123456789012:listener/{}",
            self.next_id("listener")
        ))
    }
}

pub fn config() -> ProvisionConfig {
    ProvisionConfig {
        project: "myapp".to_string(),
        vpc_id: "vpc-test".to_string(),
        ..Default::default()
    }
}
