//! Resource bindings for the Dashboard API
//!
//! Each submodule declares one model and its [`ResourceApi`] binding. Models
//! use snake_case field names; the request and response bodies are mapped to
//! and from the API's camelCase keys by [`crate::utils`].
//!
//! [`ResourceApi`]: tfmeraki_core::provider::ResourceApi

pub mod adaptive_policy_acl;
pub mod appliance_vlan;
pub mod organization_certificate;
pub mod switch_routing_interface;

pub use adaptive_policy_acl::{AdaptivePolicyAcl, AdaptivePolicyAcls};
pub use appliance_vlan::{ApplianceVlan, ApplianceVlans};
pub use organization_certificate::{OrganizationCertificate, OrganizationCertificates};
pub use switch_routing_interface::{SwitchRoutingInterface, SwitchRoutingInterfaces};

use tfmeraki_core::provider::ResourceType;

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $description:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn description(&self) -> &'static str {
                $description
            }
        }
    };
}

define_resource_type!(
    ApplianceVlanType,
    appliance_vlan::TYPE_NAME,
    "VLAN on a network's security appliance"
);
define_resource_type!(
    SwitchRoutingInterfaceType,
    switch_routing_interface::TYPE_NAME,
    "Layer 3 interface on a switch"
);
define_resource_type!(
    AdaptivePolicyAclType,
    adaptive_policy_acl::TYPE_NAME,
    "Adaptive policy ACL of an organization"
);
define_resource_type!(
    OrganizationCertificateType,
    organization_certificate::TYPE_NAME,
    "Certificate uploaded to an organization"
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(ApplianceVlanType),
        Box::new(SwitchRoutingInterfaceType),
        Box::new(AdaptivePolicyAclType),
        Box::new(OrganizationCertificateType),
    ]
}
