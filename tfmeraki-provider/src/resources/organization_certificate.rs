//! organization_certificate - Certificates uploaded to an organization
//!
//! The PEM `contents` are accepted on import but never returned, so state
//! keeps the configured value. The list endpoint wraps its results in an
//! `items` field next to paging metadata.

use tfmeraki_core::attr::Attr;
use tfmeraki_core::matcher::MatchField;
use tfmeraki_core::provider::{BoxFuture, Lookup, ProviderResult, ResourceApi};
use tfmeraki_core::resource::Value;
use tfmeraki_core::selector::MethodSelector;

use crate::client::HttpTransport;
use crate::utils::{Renames, decode, from_wire, path_param, request_body, resolve_id, segment};

pub const TYPE_NAME: &str = "organization_certificate";

const RENAMES: Renames = &[];
/// Path parameters and values set by the dashboard
const READ_ONLY_FIELDS: &[&str] = &[
    "organization_id",
    "certificate_id",
    "issued_by",
    "issued_to",
    "expires_at",
];

tfmeraki_core::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct OrganizationCertificate {
        pub organization_id: Attr<String>,
        pub certificate_id: Attr<String>,
        pub name: Attr<String>,
        pub contents: Attr<String>,
        pub issued_by: Attr<String>,
        pub issued_to: Attr<String>,
        pub expires_at: Attr<String>,
    }
}

pub struct OrganizationCertificates<T> {
    transport: T,
}

impl<T: HttpTransport> OrganizationCertificates<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn collection_path(model: &OrganizationCertificate) -> ProviderResult<String> {
        let organization_id = path_param(&model.organization_id, "organization_id")?;
        Ok(format!(
            "/organizations/{}/certificates",
            segment(organization_id)
        ))
    }

    fn item_path(model: &OrganizationCertificate, id: Option<&str>) -> ProviderResult<String> {
        let id = resolve_id(id, &model.certificate_id, "certificate_id")?;
        Ok(format!("{}/{}", Self::collection_path(model)?, segment(id)))
    }
}

impl<T: HttpTransport> ResourceApi for OrganizationCertificates<T> {
    type Model = OrganizationCertificate;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn lookups(&self, model: &OrganizationCertificate) -> MethodSelector<Lookup> {
        MethodSelector::new()
            .candidate(Lookup::Collection, vec![model.organization_id.is_known()])
            .candidate(
                Lookup::Item,
                vec![
                    model.organization_id.is_known(),
                    model.certificate_id.is_known(),
                ],
            )
    }

    fn match_target(&self, model: &OrganizationCertificate) -> Option<String> {
        model.name.known().cloned()
    }

    fn id_field(&self) -> MatchField {
        MatchField::CertificateId
    }

    fn list<'a>(&'a self, model: &'a OrganizationCertificate) -> BoxFuture<'a, ProviderResult<Value>> {
        Box::pin(async move {
            let path = Self::collection_path(model)?;
            let response = self.transport.get(path).await?;
            Ok(response.map(|json| from_wire(&json)).unwrap_or(Value::Null))
        })
    }

    fn get<'a>(
        &'a self,
        model: &'a OrganizationCertificate,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<Option<OrganizationCertificate>>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            match self.transport.get(path).await? {
                Some(json) => decode(&json, RENAMES).map(Some),
                None => Ok(None),
            }
        })
    }

    fn create<'a>(&'a self, model: &'a OrganizationCertificate) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = format!("{}/import", Self::collection_path(model)?);
            let body = request_body(model, READ_ONLY_FIELDS, RENAMES);
            self.transport.post(path, body).await?;
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        model: &'a OrganizationCertificate,
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
        model: &'a OrganizationCertificate,
        id: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = Self::item_path(model, id)?;
            self.transport.delete(path).await
        })
    }
}
