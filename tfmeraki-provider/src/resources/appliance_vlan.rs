//! appliance_vlan - VLANs of a network's security appliance
//!
//! VLAN ids are chosen by the user, so an object can be read directly once
//! `network_id` and `vlan_id` are known. Without a `vlan_id` it is found by
//! name in the network's VLAN list.

use tfmeraki_core::attr::Attr;
use tfmeraki_core::provider::{BoxFuture, Lookup, ProviderResult, ResourceApi};
use tfmeraki_core::resource::Value;
use tfmeraki_core::selector::MethodSelector;

use crate::client::HttpTransport;
use crate::utils::{Renames, decode, from_wire, path_param, request_body, resolve_id, segment};

pub const TYPE_NAME: &str = "appliance_vlan";

const RENAMES: Renames = &[("vlan_id", "id")];
const PATH_FIELDS: &[&str] = &["network_id"];

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ApplianceVlan {
        pub network_id: Attr<String>,
        pub vlan_id: Attr<String>,
        pub name: Attr<String>,
        pub subnet: Attr<String>,
        pub appliance_ip: Attr<String>,
        pub group_policy_id: Attr<String>,
        pub dhcp_handling: Attr<String>,
        pub dhcp_lease_time: Attr<String>,
        pub dns_nameservers: Attr<String>,
        pub reserved_ip_ranges: Vec<ReservedIpRange>,
        pub ipv6: Option<VlanIpv6>,
    }
}

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ReservedIpRange {
        pub start: Attr<String>,
        pub end: Attr<String>,
        pub comment: Attr<String>,
    }
}

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct VlanIpv6 {
        pub enabled: Attr<bool>,
        pub prefix_assignments: Vec<PrefixAssignment>,
    }
}

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct PrefixAssignment {
        pub autonomous: Attr<bool>,
        pub static_prefix: Attr<String>,
        pub static_appliance_ip6: Attr<String>,
    }
}

pub struct ApplianceVlans<T> {
    transport: T,
}

impl<T: HttpTransport> ApplianceVlans<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn collection_path(model: &ApplianceVlan) -> ProviderResult<String> {
        let network_id = path_param(&model.network_id, "network_id")?;
        Ok(format!("/networks/{}/appliance/vlans", segment(network_id)))
    }

    fn item_path(model: &ApplianceVlan, id: Option<&str>) -> ProviderResult<String> {
        let id = resolve_id(id, &model.vlan_id, "vlan_id")?;
        Ok(format!("{}/{}", Self::collection_path(model)?, segment(id)))
    }
}

impl<T: HttpTransport> ResourceApi for ApplianceVlans<T> {
    type Model = ApplianceVlan;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn lookups(&self, model: &ApplianceVlan) -> MethodSelector<Lookup> {
        MethodSelector::new()
            .candidate(Lookup::Collection, vec![model.network_id.is_known()])
            .candidate(
                Lookup::Item,
                vec![model.network_id.is_known(), model.vlan_id.is_known()],
            )
    }

    fn match_target(&self, model: &ApplianceVlan) -> Option<String> {
        model.name.known().cloned()
    }

    fn list<'a>(&'a self, model: &'a ApplianceVlan) -> BoxFuture<'a, ProviderResult<Value>> {
        Box::pin(async move {
            let path = Self::collection_path(model)?;
            let response = self.transport.get(path).await?;
            Ok(response.map(|json| from_wire(&json)).unwrap_or(Value::Null))
        })
    }

    fn get<'a>(
        &'a self,
        model: &'a ApplianceVlan,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Option<ApplianceVlan>>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            match self.transport.get(path).await? {
                Some(json) => decode(&json, RENAMES).map(Some),
                None => Ok(None),
            }
        })
    }

    fn create<'a>(&'a self, model: &'a ApplianceVlan) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::collection_path(model)?;
            let body = request_body(model, PATH_FIELDS, RENAMES);
            self.transport.post(path, body).await?;
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        model: &'a ApplianceVlan,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            let body = request_body(model, PATH_FIELDS, RENAMES);
            self.transport.put(path, body).await?;
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        model: &'a ApplianceVlan,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            self.transport.delete(path).await
        })
    }
}
