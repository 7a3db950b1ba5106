//! organization_adaptive_policy_acl - Adaptive policy ACLs

use tfmeraki_core::attr::Attr;
use tfmeraki_core::matcher::MatchField;
use tfmeraki_core::provider::{BoxFuture, Lookup, ProviderResult, ResourceApi};
use tfmeraki_core::resource::Value;
use tfmeraki_core::selector::MethodSelector;

use crate::client::HttpTransport;
use crate::utils::{Renames, decode, from_wire, path_param, request_body, resolve_id, segment};

pub const TYPE_NAME: &str = "organization_adaptive_policy_acl";

const RENAMES: Renames = &[];
/// Path parameters and timestamps set by the dashboard
const READ_ONLY_FIELDS: &[&str] = &["organization_id", "acl_id", "created_at", "updated_at"];

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AdaptivePolicyAcl {
        pub organization_id: Attr<String>,
        pub acl_id: Attr<String>,
        pub name: Attr<String>,
        pub description: Attr<String>,
        pub ip_version: Attr<String>,
        pub rules: Vec<AclRule>,
        pub created_at: Attr<String>,
        pub updated_at: Attr<String>,
    }
}

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AclRule {
        pub policy: Attr<String>,
        pub protocol: Attr<String>,
        pub src_port: Attr<String>,
        pub dst_port: Attr<String>,
    }
}

pub struct AdaptivePolicyAcls<T> {
    transport: T,
}

impl<T: HttpTransport> AdaptivePolicyAcls<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn collection_path(model: &AdaptivePolicyAcl) -> ProviderResult<String> {
        let organization_id = path_param(&model.organization_id, "organization_id")?;
        Ok(format!(
            "/organizations/{}/adaptivePolicy/acls",
            segment(organization_id)
        ))
    }

    fn item_path(model: &AdaptivePolicyAcl, id: Option<&str>) -> ProviderResult<String> {
        let id = resolve_id(id, &model.acl_id, "acl_id")?;
        Ok(format!("{}/{}", Self::collection_path(model)?, segment(id)))
    }
}

impl<T: HttpTransport> ResourceApi for AdaptivePolicyAcls<T> {
    type Model = AdaptivePolicyAcl;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn lookups(&self, model: &AdaptivePolicyAcl) -> MethodSelector<Lookup> {
        MethodSelector::new()
            .candidate(Lookup::Collection, vec![model.organization_id.is_known()])
            .candidate(
                Lookup::Item,
                vec![model.organization_id.is_known(), model.acl_id.is_known()],
            )
    }

    fn match_target(&self, model: &AdaptivePolicyAcl) -> Option<String> {
        model.name.known().cloned()
    }

    fn id_field(&self) -> MatchField {
        MatchField::AclId
    }

    fn list<'a>(&'a self, model: &'a AdaptivePolicyAcl) -> BoxFuture<'a, ProviderResult<Value>> {
        Box::pin(async move {
            let path = Self::collection_path(model)?;
            let response = self.transport.get(path).await?;
            Ok(response.map(|json| from_wire(&json)).unwrap_or(Value::Null))
        })
    }

    fn get<'a>(
        &'a self,
        model: &'a AdaptivePolicyAcl,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Option<AdaptivePolicyAcl>>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            match self.transport.get(path).await? {
                Some(json) => decode(&json, RENAMES).map(Some),
                None => Ok(None),
            }
        })
    }

    fn create<'a>(&'a self, model: &'a AdaptivePolicyAcl) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::collection_path(model)?;
            let body = request_body(model, READ_ONLY_FIELDS, RENAMES);
            self.transport.post(path, body).await?;
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        model: &'a AdaptivePolicyAcl,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            let body = request_body(model, READ_ONLY_FIELDS, RENAMES);
            self.transport.put(path, body).await?;
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        model: &'a AdaptivePolicyAcl,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            self.transport.delete(path).await
        })
    }
}
