//! Dashboard provider
//!
//! Owns the shared transport and hands out one [`Reconciler`] per resource
//! type, all configured the same way.

use std::sync::Arc;

use log::info;
use tfmeraki_core::provider::{ProviderError, ProviderResult, ResourceApi, ResourceType};
use tfmeraki_core::reconciler::{Reconciler, ReconcilerConfig};
use tfmeraki_core::reflect::{Reflect, to_record};
use tfmeraki_core::resource::{Record, Value};

use crate::client::{DashboardClient, HttpTransport};
use crate::config::ProviderSettings;
use crate::resources::{
    AdaptivePolicyAcls, ApplianceVlans, OrganizationCertificates, SwitchRoutingInterfaces,
    adaptive_policy_acl, appliance_vlan, organization_certificate, resource_types,
    switch_routing_interface,
};

/// Dashboard provider
pub struct MerakiProvider<T: HttpTransport> {
    transport: Arc<T>,
    config: ReconcilerConfig,
}

impl MerakiProvider<DashboardClient> {
    /// Resolve settings and connect to the Dashboard API
    pub fn connect(settings: ProviderSettings) -> ProviderResult<Self> {
        let config = settings.resolve()?;
        info!("using Dashboard API at {}", config.base_url);
        Ok(Self::new(DashboardClient::new(config)?))
    }
}

impl<T: HttpTransport> MerakiProvider<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            config: ReconcilerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &'static str {
        "meraki"
    }

    pub fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    pub fn appliance_vlans(&self) -> Reconciler<ApplianceVlans<Arc<T>>> {
        Reconciler::new(ApplianceVlans::new(self.transport.clone())).with_config(self.config)
    }

    pub fn switch_routing_interfaces(&self) -> Reconciler<SwitchRoutingInterfaces<Arc<T>>> {
        Reconciler::new(SwitchRoutingInterfaces::new(self.transport.clone()))
            .with_config(self.config)
    }

    pub fn adaptive_policy_acls(&self) -> Reconciler<AdaptivePolicyAcls<Arc<T>>> {
        Reconciler::new(AdaptivePolicyAcls::new(self.transport.clone())).with_config(self.config)
    }

    pub fn organization_certificates(&self) -> Reconciler<OrganizationCertificates<Arc<T>>> {
        Reconciler::new(OrganizationCertificates::new(self.transport.clone()))
            .with_config(self.config)
    }

    /// Refresh a stored record of the named resource type
    ///
    /// `None` means the remote object is gone.
    pub async fn read_record(
        &self,
        resource_type: &str,
        stored: &Record,
    ) -> ProviderResult<Option<Record>> {
        match resource_type {
            appliance_vlan::TYPE_NAME => read_as(&self.appliance_vlans(), stored).await,
            switch_routing_interface::TYPE_NAME => {
                read_as(&self.switch_routing_interfaces(), stored).await
            }
            adaptive_policy_acl::TYPE_NAME => read_as(&self.adaptive_policy_acls(), stored).await,
            organization_certificate::TYPE_NAME => {
                read_as(&self.organization_certificates(), stored).await
            }
            other => Err(ProviderError::configuration(format!(
                "unknown resource type '{}'",
                other
            ))),
        }
    }
}

async fn read_as<A: ResourceApi>(
    reconciler: &Reconciler<A>,
    stored: &Record,
) -> ProviderResult<Option<Record>> {
    let state = A::Model::reify(&Value::Record(stored.clone())).map_err(|e| {
        ProviderError::configuration(format!(
            "stored {} does not fit its model: {}",
            reconciler.api().type_name(),
            e
        ))
        .with_cause(e)
    })?;
    let refreshed = reconciler.read(&state).await?;
    Ok(refreshed.map(|model| to_record(&model)))
}
