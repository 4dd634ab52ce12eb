//! Cloud provider abstraction for vpcflow
//!
//! This crate defines the `NetworkProvider` trait the provisioning sequence is
//! written against, the ordered plan of steps, and the report produced by a run.

pub mod error;
pub mod plan;
pub mod provider;
pub mod provisioner;
pub mod report;

pub use error::{CloudError, Result};
pub use plan::{ActionType, Plan, PlanSummary, ResourceKind, Step, StepId};
pub use provider::*;
pub use provisioner::{NoopObserver, ProvisionError, ProvisionObserver, Provisioner};
pub use report::{ProvisionReport, ProvisionedResource, endpoint_url};
