//! Ordered provisioning steps

use serde::{Deserialize, Serialize};
use vpcflow_core::ProvisionConfig;

/// Identifies one step of the provisioning sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    RenderUserData,
    LookupVpc,
    LookupAvailabilityZones,
    CreatePublicSubnet1,
    CreatePublicSubnet2,
    CreatePrivateSubnet1,
    CreatePrivateSubnet2,
    LookupInternetGateway,
    CreateInternetGateway,
    AttachInternetGateway,
    CreatePublicRouteTable,
    CreatePublicDefaultRoute,
    AssociatePublicSubnet1,
    AssociatePublicSubnet2,
    AllocateElasticIp,
    CreateNatGateway,
    WaitNatGateway,
    CreatePrivateRouteTable,
    CreatePrivateDefaultRoute,
    AssociatePrivateSubnet1,
    AssociatePrivateSubnet2,
    CreateAlbSecurityGroup,
    AuthorizeAlbIngress,
    CreateInstanceSecurityGroup,
    AuthorizeInstanceIngress,
    AuthorizeSshIngress,
    LookupImage,
    LaunchInstance,
    WaitInstanceRunning,
    CreateLoadBalancer,
    CreateTargetGroup,
    RegisterTarget,
    CreateListener,
}

impl StepId {
    /// Every step in execution order
    pub const ALL: [StepId; 33] = [
        StepId::RenderUserData,
        StepId::LookupVpc,
        StepId::LookupAvailabilityZones,
        StepId::CreatePublicSubnet1,
        StepId::CreatePublicSubnet2,
        StepId::CreatePrivateSubnet1,
        StepId::CreatePrivateSubnet2,
        StepId::LookupInternetGateway,
        StepId::CreateInternetGateway,
        StepId::AttachInternetGateway,
        StepId::CreatePublicRouteTable,
        StepId::CreatePublicDefaultRoute,
        StepId::AssociatePublicSubnet1,
        StepId::AssociatePublicSubnet2,
        StepId::AllocateElasticIp,
        StepId::CreateNatGateway,
        StepId::WaitNatGateway,
        StepId::CreatePrivateRouteTable,
        StepId::CreatePrivateDefaultRoute,
        StepId::AssociatePrivateSubnet1,
        StepId::AssociatePrivateSubnet2,
        StepId::CreateAlbSecurityGroup,
        StepId::AuthorizeAlbIngress,
        StepId::CreateInstanceSecurityGroup,
        StepId::AuthorizeInstanceIngress,
        StepId::AuthorizeSshIngress,
        StepId::LookupImage,
        StepId::LaunchInstance,
        StepId::WaitInstanceRunning,
        StepId::CreateLoadBalancer,
        StepId::CreateTargetGroup,
        StepId::RegisterTarget,
        StepId::CreateListener,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::RenderUserData => "render-user-data",
            StepId::LookupVpc => "lookup-vpc",
            StepId::LookupAvailabilityZones => "lookup-availability-zones",
            StepId::CreatePublicSubnet1 => "create-public-subnet-1",
            StepId::CreatePublicSubnet2 => "create-public-subnet-2",
            StepId::CreatePrivateSubnet1 => "create-private-subnet-1",
            StepId::CreatePrivateSubnet2 => "create-private-subnet-2",
            StepId::LookupInternetGateway => "lookup-internet-gateway",
            StepId::CreateInternetGateway => "create-internet-gateway",
            StepId::AttachInternetGateway => "attach-internet-gateway",
            StepId::CreatePublicRouteTable => "create-public-route-table",
            StepId::CreatePublicDefaultRoute => "create-public-default-route",
            StepId::AssociatePublicSubnet1 => "associate-public-subnet-1",
            StepId::AssociatePublicSubnet2 => "associate-public-subnet-2",
            StepId::AllocateElasticIp => "allocate-elastic-ip",
            StepId::CreateNatGateway => "create-nat-gateway",
            StepId::WaitNatGateway => "wait-nat-gateway",
            StepId::CreatePrivateRouteTable => "create-private-route-table",
            StepId::CreatePrivateDefaultRoute => "create-private-default-route",
            StepId::AssociatePrivateSubnet1 => "associate-private-subnet-1",
            StepId::AssociatePrivateSubnet2 => "associate-private-subnet-2",
            StepId::CreateAlbSecurityGroup => "create-alb-security-group",
            StepId::AuthorizeAlbIngress => "authorize-alb-ingress",
            StepId::CreateInstanceSecurityGroup => "create-instance-security-group",
            StepId::AuthorizeInstanceIngress => "authorize-instance-ingress",
            StepId::AuthorizeSshIngress => "authorize-ssh-ingress",
            StepId::LookupImage => "lookup-image",
            StepId::LaunchInstance => "launch-instance",
            StepId::WaitInstanceRunning => "wait-instance-running",
            StepId::CreateLoadBalancer => "create-load-balancer",
            StepId::CreateTargetGroup => "create-target-group",
            StepId::RegisterTarget => "register-target",
            StepId::CreateListener => "create-listener",
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            StepId::RenderUserData => ActionType::Prepare,
            StepId::LookupVpc
            | StepId::LookupAvailabilityZones
            | StepId::LookupInternetGateway
            | StepId::LookupImage => ActionType::Lookup,
            StepId::AttachInternetGateway => ActionType::Attach,
            StepId::AssociatePublicSubnet1
            | StepId::AssociatePublicSubnet2
            | StepId::AssociatePrivateSubnet1
            | StepId::AssociatePrivateSubnet2 => ActionType::Associate,
            StepId::AuthorizeAlbIngress
            | StepId::AuthorizeInstanceIngress
            | StepId::AuthorizeSshIngress => ActionType::Authorize,
            StepId::RegisterTarget => ActionType::Register,
            StepId::WaitNatGateway | StepId::WaitInstanceRunning => ActionType::Wait,
            StepId::AllocateElasticIp
            | StepId::CreatePublicSubnet1
            | StepId::CreatePublicSubnet2
            | StepId::CreatePrivateSubnet1
            | StepId::CreatePrivateSubnet2
            | StepId::CreateInternetGateway
            | StepId::CreatePublicRouteTable
            | StepId::CreatePublicDefaultRoute
            | StepId::CreateNatGateway
            | StepId::CreatePrivateRouteTable
            | StepId::CreatePrivateDefaultRoute
            | StepId::CreateAlbSecurityGroup
            | StepId::CreateInstanceSecurityGroup
            | StepId::LaunchInstance
            | StepId::CreateLoadBalancer
            | StepId::CreateTargetGroup
            | StepId::CreateListener => ActionType::Create,
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            StepId::RenderUserData => ResourceKind::UserData,
            StepId::LookupVpc => ResourceKind::Vpc,
            StepId::LookupAvailabilityZones => ResourceKind::AvailabilityZone,
            StepId::CreatePublicSubnet1
            | StepId::CreatePublicSubnet2
            | StepId::CreatePrivateSubnet1
            | StepId::CreatePrivateSubnet2 => ResourceKind::Subnet,
            StepId::LookupInternetGateway
            | StepId::CreateInternetGateway
            | StepId::AttachInternetGateway => ResourceKind::InternetGateway,
            StepId::CreatePublicRouteTable | StepId::CreatePrivateRouteTable => {
                ResourceKind::RouteTable
            }
            StepId::CreatePublicDefaultRoute | StepId::CreatePrivateDefaultRoute => {
                ResourceKind::Route
            }
            StepId::AssociatePublicSubnet1
            | StepId::AssociatePublicSubnet2
            | StepId::AssociatePrivateSubnet1
            | StepId::AssociatePrivateSubnet2 => ResourceKind::RouteTableAssociation,
            StepId::AllocateElasticIp => ResourceKind::ElasticIp,
            StepId::CreateNatGateway | StepId::WaitNatGateway => ResourceKind::NatGateway,
            StepId::CreateAlbSecurityGroup | StepId::CreateInstanceSecurityGroup => {
                ResourceKind::SecurityGroup
            }
            StepId::AuthorizeAlbIngress
            | StepId::AuthorizeInstanceIngress
            | StepId::AuthorizeSshIngress => ResourceKind::IngressRule,
            StepId::LookupImage => ResourceKind::Image,
            StepId::LaunchInstance | StepId::WaitInstanceRunning => ResourceKind::Instance,
            StepId::CreateLoadBalancer => ResourceKind::LoadBalancer,
            StepId::CreateTargetGroup => ResourceKind::TargetGroup,
            StepId::RegisterTarget => ResourceKind::TargetRegistration,
            StepId::CreateListener => ResourceKind::Listener,
        }
    }

    /// Whether this step only runs when no gateway is attached to the VPC yet
    pub fn only_without_internet_gateway(&self) -> bool {
        matches!(
            self,
            StepId::CreateInternetGateway | StepId::AttachInternetGateway
        )
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of action a step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Local preparation, no API call
    Prepare,
    /// Read-only API call
    Lookup,
    /// Create a new resource
    Create,
    /// An existing resource is used instead of creating one
    Reuse,
    Attach,
    Associate,
    Authorize,
    Register,
    /// Block until an asynchronous resource is ready
    Wait,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Prepare => write!(f, "prepare"),
            ActionType::Lookup => write!(f, "lookup"),
            ActionType::Create => write!(f, "create"),
            ActionType::Reuse => write!(f, "reuse"),
            ActionType::Attach => write!(f, "attach"),
            ActionType::Associate => write!(f, "associate"),
            ActionType::Authorize => write!(f, "authorize"),
            ActionType::Register => write!(f, "register"),
            ActionType::Wait => write!(f, "wait"),
        }
    }
}

/// Kind of remote resource a step touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    UserData,
    Vpc,
    AvailabilityZone,
    Subnet,
    InternetGateway,
    RouteTable,
    Route,
    RouteTableAssociation,
    ElasticIp,
    NatGateway,
    SecurityGroup,
    IngressRule,
    Image,
    Instance,
    LoadBalancer,
    TargetGroup,
    TargetRegistration,
    Listener,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::UserData => "user-data",
            ResourceKind::Vpc => "vpc",
            ResourceKind::AvailabilityZone => "availability-zone",
            ResourceKind::Subnet => "subnet",
            ResourceKind::InternetGateway => "internet-gateway",
            ResourceKind::RouteTable => "route-table",
            ResourceKind::Route => "route",
            ResourceKind::RouteTableAssociation => "route-table-association",
            ResourceKind::ElasticIp => "elastic-ip",
            ResourceKind::NatGateway => "nat-gateway",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::IngressRule => "ingress-rule",
            ResourceKind::Image => "image",
            ResourceKind::Instance => "instance",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::TargetGroup => "target-group",
            ResourceKind::TargetRegistration => "target-registration",
            ResourceKind::Listener => "listener",
        };
        f.write_str(name)
    }
}

/// One planned step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,

    pub action_type: ActionType,

    pub resource_type: ResourceKind,

    /// Human readable description with the concrete values from the config
    pub description: String,

    /// Skipped when an internet gateway is already attached
    pub conditional: bool,
}

impl Step {
    fn new(id: StepId, description: impl Into<String>) -> Self {
        Self {
            id,
            action_type: id.action_type(),
            resource_type: id.resource_kind(),
            description: description.into(),
            conditional: id.only_without_internet_gateway(),
        }
    }
}

/// Ordered list of steps for one configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    /// Build the plan for a configuration. No API calls are made.
    pub fn for_config(config: &ProvisionConfig) -> Self {
        let steps = StepId::ALL
            .iter()
            .filter(|id| **id != StepId::AuthorizeSshIngress || config.ssh.is_some())
            .map(|id| Step::new(*id, describe(*id, config)))
            .collect();
        Self { steps }
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.step(id).is_some()
    }

    /// Get steps by action type
    pub fn steps_by_type(&self, action_type: ActionType) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| s.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            lookup: self.steps_by_type(ActionType::Lookup).len(),
            create: self.steps_by_type(ActionType::Create).len(),
            wait: self.steps_by_type(ActionType::Wait).len(),
            other: self
                .steps
                .iter()
                .filter(|s| {
                    !matches!(
                        s.action_type,
                        ActionType::Lookup | ActionType::Create | ActionType::Wait
                    )
                })
                .count(),
        }
    }
}

/// Summary of planned steps
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub lookup: usize,
    pub create: usize,
    pub wait: usize,
    pub other: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} lookups, {} waits, {} other",
            self.create, self.lookup, self.wait, self.other
        )
    }
}

fn zone_label(config: &ProvisionConfig, index: usize) -> String {
    config
        .network
        .zones
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("AZ {}", index + 1))
}

fn cidr(subnets: &[String], index: usize) -> String {
    subnets.get(index).cloned().unwrap_or_default()
}

fn describe(id: StepId, config: &ProvisionConfig) -> String {
    let network = &config.network;

    match id {
        StepId::RenderUserData => "Render the instance user data".to_string(),
        StepId::LookupVpc => format!("Check that {} exists", config.vpc_id),
        StepId::LookupAvailabilityZones => {
            if network.zones.is_empty() {
                "Pick the first two available zones".to_string()
            } else {
                format!("Use zones {}", network.zones.join(", "))
            }
        }
        StepId::CreatePublicSubnet1 => format!(
            "Public subnet {} in {}",
            cidr(&network.public_subnets, 0),
            zone_label(config, 0)
        ),
        StepId::CreatePublicSubnet2 => format!(
            "Public subnet {} in {}",
            cidr(&network.public_subnets, 1),
            zone_label(config, 1)
        ),
        StepId::CreatePrivateSubnet1 => format!(
            "Private subnet {} in {}",
            cidr(&network.private_subnets, 0),
            zone_label(config, 0)
        ),
        StepId::CreatePrivateSubnet2 => format!(
            "Private subnet {} in {}",
            cidr(&network.private_subnets, 1),
            zone_label(config, 1)
        ),
        StepId::LookupInternetGateway => {
            "Find an internet gateway attached to the VPC".to_string()
        }
        StepId::CreateInternetGateway => config.resource_name("igw"),
        StepId::AttachInternetGateway => format!("Attach the gateway to {}", config.vpc_id),
        StepId::CreatePublicRouteTable => config.resource_name("public-rt"),
        StepId::CreatePublicDefaultRoute => "0.0.0.0/0 via the internet gateway".to_string(),
        StepId::AssociatePublicSubnet1 => "Public route table ↔ public subnet 1".to_string(),
        StepId::AssociatePublicSubnet2 => "Public route table ↔ public subnet 2".to_string(),
        StepId::AllocateElasticIp => config.resource_name("nat-eip"),
        StepId::CreateNatGateway => format!("{} in public subnet 1", config.resource_name("nat")),
        StepId::WaitNatGateway => format!(
            "Wait for the NAT gateway to become available (max {}s)",
            config.wait.nat_gateway_secs
        ),
        StepId::CreatePrivateRouteTable => config.resource_name("private-rt"),
        StepId::CreatePrivateDefaultRoute => "0.0.0.0/0 via the NAT gateway".to_string(),
        StepId::AssociatePrivateSubnet1 => "Private route table ↔ private subnet 1".to_string(),
        StepId::AssociatePrivateSubnet2 => "Private route table ↔ private subnet 2".to_string(),
        StepId::CreateAlbSecurityGroup => config.resource_name("alb-sg"),
        StepId::AuthorizeAlbIngress => format!(
            "tcp/{} from 0.0.0.0/0 to the load balancer",
            config.app.listener_port
        ),
        StepId::CreateInstanceSecurityGroup => config.resource_name("instance-sg"),
        StepId::AuthorizeInstanceIngress => format!(
            "tcp/{} from the load balancer security group",
            config.app.port
        ),
        StepId::AuthorizeSshIngress => format!(
            "tcp/22 from {}",
            config
                .ssh
                .as_ref()
                .map(|s| s.allow_cidr.as_str())
                .unwrap_or_default()
        ),
        StepId::LookupImage => format!(
            "Newest image {} owned by {}",
            config.instance.image.name, config.instance.image.owner
        ),
        StepId::LaunchInstance => format!(
            "{} ({}) in private subnet 1",
            config.resource_name("web"),
            config.instance.instance_type
        ),
        StepId::WaitInstanceRunning => format!(
            "Wait for the instance to be running (max {}s)",
            config.wait.instance_secs
        ),
        StepId::CreateLoadBalancer => format!(
            "{} (internet-facing, public subnets)",
            config.resource_name("alb")
        ),
        StepId::CreateTargetGroup => format!(
            "{} (HTTP:{} health check {})",
            config.resource_name("tg"),
            config.app.port,
            config.app.health_check_path
        ),
        StepId::RegisterTarget => format!("Register the instance on port {}", config.app.port),
        StepId::CreateListener => format!(
            "HTTP:{} forward to the target group",
            config.app.listener_port
        ),
    }
}
