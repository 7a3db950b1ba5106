//! switch_routing_interface - Layer 3 interfaces of a switch
//!
//! Interface ids are assigned by the dashboard; a configuration usually only
//! names the interface, so the id is recovered from the device's interface
//! list. OSPF settings nest three levels deep (`ospf_v3.timers`).

use tfmeraki_core::attr::Attr;
use tfmeraki_core::matcher::MatchField;
use tfmeraki_core::provider::{BoxFuture, Lookup, ProviderResult, ResourceApi};
use tfmeraki_core::resource::Value;
use tfmeraki_core::selector::MethodSelector;

use crate::client::HttpTransport;
use crate::utils::{Renames, decode, from_wire, path_param, request_body, resolve_id, segment};

pub const TYPE_NAME: &str = "switch_routing_interface";

const RENAMES: Renames = &[];
const PATH_FIELDS: &[&str] = &["serial", "interface_id"];

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct SwitchRoutingInterface {
        pub serial: Attr<String>,
        pub interface_id: Attr<String>,
        pub name: Attr<String>,
        pub subnet: Attr<String>,
        pub interface_ip: Attr<String>,
        pub vlan_id: Attr<i64>,
        pub default_gateway: Attr<String>,
        pub multicast_routing: Attr<String>,
        pub ospf_settings: Option<OspfSettings>,
        pub ospf_v3: Option<OspfV3Settings>,
        pub ipv6: Option<InterfaceIpv6>,
    }
}

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct OspfSettings {
        pub area: Attr<String>,
        pub cost: Attr<i64>,
        pub is_passive_enabled: Attr<bool>,
    }
}

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct OspfV3Settings {
        pub area: Attr<String>,
        pub cost: Attr<i64>,
        pub is_passive_enabled: Attr<bool>,
        pub timers: Option<OspfTimers>,
    }
}

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct OspfTimers {
        pub hello_timer_in_seconds: Attr<i64>,
        pub dead_timer_in_seconds: Attr<i64>,
    }
}

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct InterfaceIpv6 {
        pub assignment_mode: Attr<String>,
        pub address: Attr<String>,
        pub prefix: Attr<String>,
        pub gateway: Attr<String>,
    }
}

pub struct SwitchRoutingInterfaces<T> {
    transport: T,
}

impl<T: HttpTransport> SwitchRoutingInterfaces<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn collection_path(model: &SwitchRoutingInterface) -> ProviderResult<String> {
        let serial = path_param(&model.serial, "serial")?;
        Ok(format!("/devices/{}/switch/routing/interfaces", segment(serial)))
    }

    fn item_path(model: &SwitchRoutingInterface, id: Option<&str>) -> ProviderResult<String> {
        let id = resolve_id(id, &model.interface_id, "interface_id")?;
        Ok(format!("{}/{}", Self::collection_path(model)?, segment(id)))
    }
}

impl<T: HttpTransport> ResourceApi for SwitchRoutingInterfaces<T> {
    type Model = SwitchRoutingInterface;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn lookups(&self, model: &SwitchRoutingInterface) -> MethodSelector<Lookup> {
        MethodSelector::new()
            .candidate(Lookup::Collection, vec![model.serial.is_known()])
            .candidate(
                Lookup::Item,
                vec![model.serial.is_known(), model.interface_id.is_known()],
            )
    }

    fn match_target(&self, model: &SwitchRoutingInterface) -> Option<String> {
        model.name.known().cloned()
    }

    fn id_field(&self) -> MatchField {
        MatchField::InterfaceId
    }

    fn list<'a>(
        &'a self,
        model: &'a SwitchRoutingInterface,
    ) -> BoxFuture<'a, ProviderResult<Value>> {
        Box::pin(async move {
            let path = Self::collection_path(model)?;
            let response = self.transport.get(path).await?;
            Ok(response.map(|json| from_wire(&json)).unwrap_or(Value::Null))
        })
    }

    fn get<'a>(
        &'a self,
        model: &'a SwitchRoutingInterface,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Option<SwitchRoutingInterface>>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            match self.transport.get(path).await? {
                Some(json) => decode(&json, RENAMES).map(Some),
                None => Ok(None),
            }
        })
    }

    fn create<'a>(
        &'a self,
        model: &'a SwitchRoutingInterface,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::collection_path(model)?;
            let body = request_body(model, PATH_FIELDS, RENAMES);
            self.transport.post(path, body).await?;
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        model: &'a SwitchRoutingInterface,
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
        model: &'a SwitchRoutingInterface,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            self.transport.delete(path).await
        })
    }
}
