//! Generic reconciliation of resources and data sources
//!
//! A [`ResourceKind`] adapts one remote object type: its record shape, its
//! identity and the remote calls behind each lifecycle step.
//! [`ResourceController`] runs the shared lifecycle on top of it. Every step
//! reports into one [`Diagnostics`] and stops at the first error, in which
//! case the response carries no state and the tracked object is left alone.

use crate::diag::Diagnostics;
use crate::schema::Schema;
use crate::state::{ObjectState, Record};
use async_trait::async_trait;
use cldform_admin::{AdminApi, AdminError};
use std::sync::Arc;

/// Adapter for one managed resource type
#[async_trait]
pub trait ResourceKind: Send + Sync {
    type Model: Record + Send + Sync;

    /// Registered type name, e.g. `cloudinary_upload_mapping`
    const TYPE_NAME: &'static str;

    /// Noun used in diagnostics, e.g. `upload mapping`
    const NOUN: &'static str;

    /// External identity of a record, if known
    fn identity(model: &Self::Model) -> Option<&str>;

    async fn create(
        &self,
        client: &dyn AdminApi,
        plan: &Self::Model,
    ) -> Result<Self::Model, AdminError>;

    async fn read(
        &self,
        client: &dyn AdminApi,
        state: &Self::Model,
    ) -> Result<Self::Model, AdminError>;

    async fn update(
        &self,
        client: &dyn AdminApi,
        plan: &Self::Model,
        prior: &Self::Model,
    ) -> Result<Self::Model, AdminError>;

    async fn delete(&self, client: &dyn AdminApi, state: &Self::Model) -> Result<(), AdminError>;

    /// Seed a record from an external identity; the rest is filled by a read
    fn import(id: &str) -> Self::Model;

    /// Attributes that cannot be verified right after an import
    fn import_verify_ignore() -> &'static [&'static str] {
        &[]
    }
}

/// Adapter for one read-only data source type
#[async_trait]
pub trait DataSourceKind: Send + Sync {
    type Model: Record + Send + Sync;

    const TYPE_NAME: &'static str;
    const NOUN: &'static str;

    async fn read(
        &self,
        client: &dyn AdminApi,
        config: &Self::Model,
    ) -> Result<Self::Model, AdminError>;
}

/// Outcome of one resource operation.
///
/// `state` is `None` when the operation failed; the tracked object must then
/// stay as it was.
#[derive(Debug, Default)]
pub struct ResourceResponse {
    pub state: Option<ObjectState>,
    pub diagnostics: Diagnostics,
}

impl ResourceResponse {
    fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            state: None,
            diagnostics,
        }
    }

    fn ok(state: ObjectState, diagnostics: Diagnostics) -> Self {
        Self {
            state: Some(state),
            diagnostics,
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }
}

/// Outcome of one data source read
#[derive(Debug, Default)]
pub struct DataSourceResponse {
    pub state: Option<ObjectState>,
    pub diagnostics: Diagnostics,
}

impl DataSourceResponse {
    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }
}

/// Required attributes must be known before a remote call is made
fn check_known(schema: &Schema, state: &ObjectState, diags: &mut Diagnostics) {
    for (name, attribute) in &schema.attributes {
        if !attribute.required {
            continue;
        }
        let known = state
            .attributes
            .get(*name)
            .and_then(|v| v.get("state"))
            .and_then(|s| s.as_str())
            == Some("known");
        if !known {
            diags.add_attribute_error(
                *name,
                "Unknown Value",
                format!(
                    "\"{}\" must be known before it can be sent to the remote account.",
                    name
                ),
            );
        }
    }
}

/// Drives the lifecycle of one resource type
pub struct ResourceController<K: ResourceKind> {
    kind: K,
    client: Arc<dyn AdminApi>,
}

impl<K: ResourceKind> ResourceController<K> {
    pub fn new(kind: K, client: Arc<dyn AdminApi>) -> Self {
        Self { kind, client }
    }

    pub fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    pub fn schema(&self) -> Schema {
        K::Model::schema()
    }

    pub fn import_verify_ignore(&self) -> &'static [&'static str] {
        K::import_verify_ignore()
    }

    /// Decode a record, adding any failure to `diags`
    fn decode(state: &ObjectState, diags: &mut Diagnostics) -> Option<K::Model> {
        match state.get::<K::Model>() {
            Ok(model) => Some(model),
            Err(d) => {
                diags.append(d);
                None
            }
        }
    }

    /// Build a fresh state holding `model`
    fn encode(model: &K::Model, diags: &mut Diagnostics) -> Option<ObjectState> {
        let mut state = ObjectState::new(K::TYPE_NAME);
        diags.append(state.set(model));
        if diags.has_error() {
            return None;
        }
        Some(state)
    }

    fn require_identity<'a>(model: &'a K::Model, diags: &mut Diagnostics) -> Option<&'a str> {
        let id = K::identity(model).filter(|id| !id.is_empty());
        if id.is_none() {
            diags.add_error(
                "Missing Resource Identity",
                format!(
                    "The tracked {} has no identity; it cannot be matched to a remote object.",
                    K::NOUN
                ),
            );
        }
        id
    }

    /// Create the remote object from a desired configuration
    pub async fn create(&self, config: &ObjectState) -> ResourceResponse {
        let mut diags = K::Model::schema().validate(&config.attributes, true);
        if diags.has_error() {
            return ResourceResponse::failed(diags);
        }
        check_known(&K::Model::schema(), config, &mut diags);
        if diags.has_error() {
            return ResourceResponse::failed(diags);
        }

        let Some(plan) = Self::decode(config, &mut diags) else {
            return ResourceResponse::failed(diags);
        };

        let created = match self.kind.create(self.client.as_ref(), &plan).await {
            Ok(created) => created,
            Err(e) => {
                diags.add_client_error("create", K::NOUN, &e);
                return ResourceResponse::failed(diags);
            }
        };

        let Some(state) = Self::encode(&created, &mut diags) else {
            return ResourceResponse::failed(diags);
        };

        tracing::trace!(
            resource = K::TYPE_NAME,
            id = K::identity(&created).unwrap_or_default(),
            "created a resource"
        );
        ResourceResponse::ok(state, diags)
    }

    /// Refresh tracked state from the remote object
    pub async fn read(&self, state: &ObjectState) -> ResourceResponse {
        let mut diags = Diagnostics::new();

        let Some(tracked) = Self::decode(state, &mut diags) else {
            return ResourceResponse::failed(diags);
        };
        if Self::require_identity(&tracked, &mut diags).is_none() {
            return ResourceResponse::failed(diags);
        }

        let current = match self.kind.read(self.client.as_ref(), &tracked).await {
            Ok(current) => current,
            Err(e) => {
                diags.add_client_error("read", K::NOUN, &e);
                return ResourceResponse::failed(diags);
            }
        };

        match Self::encode(&current, &mut diags) {
            Some(state) => ResourceResponse::ok(state, diags),
            None => ResourceResponse::failed(diags),
        }
    }

    /// Apply an in-place change.
    ///
    /// The identity must not change here; a new identity means replacement,
    /// which the planner turns into delete and create.
    pub async fn update(&self, plan: &ObjectState, prior: &ObjectState) -> ResourceResponse {
        let mut diags = Diagnostics::new();
        check_known(&K::Model::schema(), plan, &mut diags);
        if diags.has_error() {
            return ResourceResponse::failed(diags);
        }

        let Some(planned) = Self::decode(plan, &mut diags) else {
            return ResourceResponse::failed(diags);
        };
        let Some(tracked) = Self::decode(prior, &mut diags) else {
            return ResourceResponse::failed(diags);
        };

        let Some(prior_id) = Self::require_identity(&tracked, &mut diags) else {
            return ResourceResponse::failed(diags);
        };
        if K::identity(&planned).is_some_and(|id| id != prior_id) {
            diags.add_error(
                "Resource Replacement Required",
                format!(
                    "The identity of {} \"{}\" cannot change in place.",
                    K::NOUN,
                    prior_id
                ),
            );
            return ResourceResponse::failed(diags);
        }

        let updated = match self
            .kind
            .update(self.client.as_ref(), &planned, &tracked)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                diags.add_client_error("update", K::NOUN, &e);
                return ResourceResponse::failed(diags);
            }
        };

        match Self::encode(&updated, &mut diags) {
            Some(state) => ResourceResponse::ok(state, diags),
            None => ResourceResponse::failed(diags),
        }
    }

    /// Delete the remote object; the returned state is marked removed
    pub async fn delete(&self, state: &ObjectState) -> ResourceResponse {
        let mut diags = Diagnostics::new();

        let Some(tracked) = Self::decode(state, &mut diags) else {
            return ResourceResponse::failed(diags);
        };
        if Self::require_identity(&tracked, &mut diags).is_none() {
            return ResourceResponse::failed(diags);
        }

        if let Err(e) = self.kind.delete(self.client.as_ref(), &tracked).await {
            diags.add_client_error("delete", K::NOUN, &e);
            return ResourceResponse::failed(diags);
        }

        let mut removed = state.clone();
        removed.remove();
        ResourceResponse::ok(removed, diags)
    }

    /// Start tracking an existing remote object by identity.
    ///
    /// No remote call is made; attributes other than the identity stay
    /// unknown until the next read.
    pub fn import_state(&self, id: &str) -> ResourceResponse {
        let mut diags = Diagnostics::new();
        if id.is_empty() {
            diags.add_error(
                "Invalid Import Identifier",
                format!("Importing a {} requires a non-empty identifier.", K::NOUN),
            );
            return ResourceResponse::failed(diags);
        }

        let seeded = K::import(id);
        match Self::encode(&seeded, &mut diags) {
            Some(state) => ResourceResponse::ok(state, diags),
            None => ResourceResponse::failed(diags),
        }
    }
}

/// Runs reads of one data source type
pub struct DataSourceController<K: DataSourceKind> {
    kind: K,
    client: Arc<dyn AdminApi>,
}

impl<K: DataSourceKind> DataSourceController<K> {
    pub fn new(kind: K, client: Arc<dyn AdminApi>) -> Self {
        Self { kind, client }
    }

    pub fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    pub fn schema(&self) -> Schema {
        K::Model::schema()
    }

    /// Read the data source. On error no state is returned, so an earlier
    /// snapshot is kept as it was.
    pub async fn read(&self, config: &ObjectState) -> DataSourceResponse {
        let mut diags = K::Model::schema().validate(&config.attributes, true);
        if diags.has_error() {
            return DataSourceResponse {
                state: None,
                diagnostics: diags,
            };
        }

        let query = match config.get::<K::Model>() {
            Ok(query) => query,
            Err(d) => {
                diags.append(d);
                return DataSourceResponse {
                    state: None,
                    diagnostics: diags,
                };
            }
        };

        let result = match self.kind.read(self.client.as_ref(), &query).await {
            Ok(result) => result,
            Err(e) => {
                diags.add_client_error("read", K::NOUN, &e);
                return DataSourceResponse {
                    state: None,
                    diagnostics: diags,
                };
            }
        };

        let mut state = ObjectState::new(K::TYPE_NAME);
        diags.append(state.set(&result));
        if diags.has_error() {
            return DataSourceResponse {
                state: None,
                diagnostics: diags,
            };
        }

        tracing::debug!(data_source = K::TYPE_NAME, "read data source");
        DataSourceResponse {
            state: Some(state),
            diagnostics: diags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeType};
    use crate::value::AttrValue;
    use cldform_admin::MockAdminApi;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Tag {
        name: AttrValue<String>,
        id: AttrValue<String>,
    }

    impl Record for Tag {
        fn schema() -> Schema {
            Schema::new("tag")
                .with_attribute("name", Attribute::required(AttributeType::String))
                .with_attribute("id", Attribute::computed(AttributeType::String))
        }
    }

    /// Echoes records back without touching the client
    struct Echo {
        fail_with: Option<AdminError>,
    }

    #[async_trait]
    impl ResourceKind for Echo {
        type Model = Tag;
        const TYPE_NAME: &'static str = "test_tag";
        const NOUN: &'static str = "tag";

        fn identity(model: &Tag) -> Option<&str> {
            model.id.as_known().map(String::as_str)
        }

        async fn create(&self, _client: &dyn AdminApi, plan: &Tag) -> Result<Tag, AdminError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            Ok(Tag {
                name: plan.name.clone(),
                id: plan.name.clone(),
            })
        }

        async fn read(&self, _client: &dyn AdminApi, state: &Tag) -> Result<Tag, AdminError> {
            Ok(state.clone())
        }

        async fn update(
            &self,
            _client: &dyn AdminApi,
            plan: &Tag,
            _prior: &Tag,
        ) -> Result<Tag, AdminError> {
            Ok(plan.clone())
        }

        async fn delete(&self, _client: &dyn AdminApi, _state: &Tag) -> Result<(), AdminError> {
            Ok(())
        }

        fn import(id: &str) -> Tag {
            Tag {
                name: AttrValue::Unknown,
                id: AttrValue::known(id),
            }
        }
    }

    fn controller(fail_with: Option<AdminError>) -> ResourceController<Echo> {
        ResourceController::new(Echo { fail_with }, Arc::new(MockAdminApi::new()))
    }

    fn tag(name: AttrValue<String>, id: AttrValue<String>) -> ObjectState {
        ObjectState::from_record("test_tag", &Tag { name, id }).unwrap()
    }

    #[tokio::test]
    async fn test_create_sets_identity() {
        let resp = controller(None)
            .create(&tag(AttrValue::known("a"), AttrValue::Null))
            .await;
        assert!(!resp.has_error(), "{}", resp.diagnostics);
        assert_eq!(resp.state.unwrap().id().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_required_value() {
        let resp = controller(None)
            .create(&tag(AttrValue::Unknown, AttrValue::Null))
            .await;
        assert!(resp.state.is_none());
        assert_eq!(resp.diagnostics.errors().next().unwrap().summary, "Unknown Value");
    }

    #[tokio::test]
    async fn test_create_rejects_configured_computed_attribute() {
        let resp = controller(None)
            .create(&tag(AttrValue::known("a"), AttrValue::known("b")))
            .await;
        assert!(resp.has_error());
        assert!(resp.state.is_none());
    }

    #[tokio::test]
    async fn test_remote_error_keeps_state_untouched() {
        let resp = controller(Some(AdminError::Api("quota exceeded".to_string())))
            .create(&tag(AttrValue::known("a"), AttrValue::Null))
            .await;
        assert!(resp.state.is_none());
        let err = resp.diagnostics.errors().next().unwrap();
        assert_eq!(err.summary, "Client Error");
        assert_eq!(err.detail, "Unable to create tag, got error: quota exceeded");
    }

    #[tokio::test]
    async fn test_read_requires_identity() {
        let resp = controller(None)
            .read(&tag(AttrValue::known("a"), AttrValue::Null))
            .await;
        assert!(resp.state.is_none());
        assert_eq!(
            resp.diagnostics.errors().next().unwrap().summary,
            "Missing Resource Identity"
        );
    }

    #[tokio::test]
    async fn test_update_refuses_identity_change() {
        let prior = tag(AttrValue::known("a"), AttrValue::known("a"));
        let plan = tag(AttrValue::known("b"), AttrValue::known("b"));
        let resp = controller(None).update(&plan, &prior).await;
        assert!(resp.state.is_none());
        assert_eq!(
            resp.diagnostics.errors().next().unwrap().summary,
            "Resource Replacement Required"
        );
    }

    #[tokio::test]
    async fn test_delete_marks_removed() {
        let resp = controller(None)
            .delete(&tag(AttrValue::known("a"), AttrValue::known("a")))
            .await;
        let state = resp.state.unwrap();
        assert!(state.is_removed());
        assert!(state.is_empty());
    }

    #[test]
    fn test_import_rejects_empty_id() {
        let resp = controller(None).import_state("");
        assert!(resp.has_error());
        assert!(resp.state.is_none());
    }
}
