//! Record of what a provisioning run created
//!
//! Nothing here is persisted; the report is printed once at the end of a run
//! (or, on failure, used to list the resources left behind).

use crate::error::Result;
use crate::plan::ResourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resource created (or reused) during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedResource {
    pub kind: ResourceKind,

    /// Provider-assigned id (or ARN for load balancer resources)
    pub id: String,

    /// Value of the `Name` tag
    pub name: Option<String>,

    /// True when the resource already existed and was not created by this run
    pub reused: bool,

    /// Resource attributes (CIDR, zone, public IP, DNS name, ...)
    pub attributes: BTreeMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

impl ProvisionedResource {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: None,
            reused: false,
            attributes: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn reused(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            reused: true,
            ..Self::new(kind, id)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionReport {
    pub project: String,

    pub region: String,

    pub vpc_id: String,

    pub availability_zones: Vec<String>,

    pub image_id: Option<String>,

    /// Resources in creation order
    pub resources: Vec<ProvisionedResource>,

    pub load_balancer_dns: Option<String>,

    /// `http://<dns>/` once the listener exists
    pub endpoint: Option<String>,

    pub started_at: DateTime<Utc>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ProvisionReport {
    pub fn new(
        project: impl Into<String>,
        region: impl Into<String>,
        vpc_id: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            region: region.into(),
            vpc_id: vpc_id.into(),
            availability_zones: Vec::new(),
            image_id: None,
            resources: Vec::new(),
            load_balancer_dns: None,
            endpoint: None,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn push(&mut self, resource: ProvisionedResource) {
        tracing::debug!(
            kind = %resource.kind,
            id = %resource.id,
            reused = resource.reused,
            "Recorded resource"
        );
        self.resources.push(resource);
    }

    /// Resources this run created (reused ones excluded)
    pub fn created(&self) -> impl Iterator<Item = &ProvisionedResource> {
        self.resources.iter().filter(|r| !r.reused)
    }

    pub fn by_kind(&self, kind: ResourceKind) -> Vec<&ProvisionedResource> {
        self.resources.iter().filter(|r| r.kind == kind).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Endpoint URL for a load balancer DNS name and listener port
pub fn endpoint_url(dns_name: &str, port: u16) -> String {
    if port == 80 {
        format!("http://{}/", dns_name)
    } else {
        format!("http://{}:{}/", dns_name, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("myapp-alb-1.us-east-1.elb.amazonaws.com", 80),
            "http://myapp-alb-1.us-east-1.elb.amazonaws.com/"
        );
        assert_eq!(endpoint_url("lb.example", 8080), "http://lb.example:8080/");
    }

    #[test]
    fn test_created_excludes_reused() {
        let mut report = ProvisionReport::new("myapp", "us-east-1", "vpc-1");
        report.push(ProvisionedResource::new(ResourceKind::Subnet, "subnet-1"));
        report.push(ProvisionedResource::reused(
            ResourceKind::InternetGateway,
            "igw-1",
        ));
        report.push(ProvisionedResource::new(ResourceKind::RouteTable, "rtb-1"));

        let created: Vec<_> = report.created().map(|r| r.id.as_str()).collect();
        assert_eq!(created, vec!["subnet-1", "rtb-1"]);
        assert_eq!(report.by_kind(ResourceKind::InternetGateway).len(), 1);
    }

    #[test]
    fn test_attributes() {
        let resource = ProvisionedResource::new(ResourceKind::Subnet, "subnet-1")
            .with_name("myapp-public-1")
            .with_attribute("cidr", serde_json::json!("10.0.1.0/24"));
        assert_eq!(
            resource.get_attribute::<String>("cidr"),
            Some("10.0.1.0/24".to_string())
        );
        assert_eq!(resource.get_attribute::<String>("zone"), None);
    }

    #[test]
    fn test_report_json() {
        let mut report = ProvisionReport::new("myapp", "us-east-1", "vpc-1");
        report.push(
            ProvisionedResource::new(ResourceKind::NatGateway, "nat-1").with_name("myapp-nat"),
        );
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["vpc_id"], "vpc-1");
        assert_eq!(value["resources"][0]["kind"], "nat-gateway");
        assert_eq!(value["resources"][0]["name"], "myapp-nat");
    }
}
