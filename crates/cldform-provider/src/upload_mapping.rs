//! Upload mapping resource and data source
//!
//! An upload mapping sends uploads into `folder` through a URL `template`.
//! The folder is the identity of the mapping and is mirrored into `id`.

use crate::provider::{ADMIN_UPLOAD_MAPPING, UPLOAD_MAPPING};
use crate::reconcile::{DataSourceKind, ResourceKind};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::Record;
use crate::value::AttrValue;
use async_trait::async_trait;
use cldform_admin::{AdminApi, AdminError, UploadMapping};
use serde::{Deserialize, Serialize};

/// Tracked record of a mapping resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadMappingModel {
    pub folder: AttrValue<String>,
    pub id: AttrValue<String>,
    pub template: AttrValue<String>,
}

impl UploadMappingModel {
    /// Desired configuration with a known folder and template
    pub fn desired(folder: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            folder: AttrValue::known(folder),
            id: AttrValue::Null,
            template: AttrValue::known(template),
        }
    }

    /// Record mirroring a remote mapping; `id` follows `folder`
    fn from_remote(folder: &str, remote: UploadMapping) -> Self {
        Self {
            folder: AttrValue::known(folder),
            id: AttrValue::known(folder),
            template: AttrValue::known(remote.template),
        }
    }
}

impl Record for UploadMappingModel {
    fn schema() -> Schema {
        Schema::new("Upload mapping from a folder to a URL template.")
            .with_attribute(
                "folder",
                Attribute::required(AttributeType::String)
                    .requires_replace()
                    .with_description("Folder name the mapping applies to"),
            )
            .with_attribute(
                "id",
                Attribute::computed(AttributeType::String)
                    .with_description("Identifier of the mapping, same as the folder"),
            )
            .with_attribute(
                "template",
                Attribute::required(AttributeType::String)
                    .with_description("URL template fetched for uploads into the folder"),
            )
    }
}

/// Lookup record of the mapping data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadMappingLookup {
    pub folder: AttrValue<String>,
    pub id: AttrValue<String>,
    pub template: AttrValue<String>,
}

impl UploadMappingLookup {
    pub fn folder(folder: impl Into<String>) -> Self {
        Self {
            folder: AttrValue::known(folder),
            ..Default::default()
        }
    }
}

impl Record for UploadMappingLookup {
    fn schema() -> Schema {
        Schema::new("Look up the upload mapping of a folder.")
            .with_attribute("folder", Attribute::required(AttributeType::String))
            .with_attribute("id", Attribute::computed(AttributeType::String))
            .with_attribute("template", Attribute::computed(AttributeType::String))
    }
}

pub struct UploadMappingResource;

#[async_trait]
impl ResourceKind for UploadMappingResource {
    type Model = UploadMappingModel;

    const TYPE_NAME: &'static str = UPLOAD_MAPPING;
    const NOUN: &'static str = "upload mapping";

    fn identity(model: &UploadMappingModel) -> Option<&str> {
        model.folder.as_known().map(String::as_str)
    }

    async fn create(
        &self,
        client: &dyn AdminApi,
        plan: &UploadMappingModel,
    ) -> Result<UploadMappingModel, AdminError> {
        let folder = plan.folder.as_str();
        let remote = client
            .create_upload_mapping(folder, plan.template.as_str())
            .await?;
        Ok(UploadMappingModel::from_remote(folder, remote))
    }

    async fn read(
        &self,
        client: &dyn AdminApi,
        state: &UploadMappingModel,
    ) -> Result<UploadMappingModel, AdminError> {
        let folder = state.folder.as_str();
        let remote = client.get_upload_mapping(folder).await?;
        Ok(UploadMappingModel::from_remote(folder, remote))
    }

    async fn update(
        &self,
        client: &dyn AdminApi,
        plan: &UploadMappingModel,
        _prior: &UploadMappingModel,
    ) -> Result<UploadMappingModel, AdminError> {
        let folder = plan.folder.as_str();
        let remote = client
            .update_upload_mapping(folder, plan.template.as_str())
            .await?;
        Ok(UploadMappingModel::from_remote(folder, remote))
    }

    async fn delete(
        &self,
        client: &dyn AdminApi,
        state: &UploadMappingModel,
    ) -> Result<(), AdminError> {
        client.delete_upload_mapping(state.folder.as_str()).await
    }

    fn import(id: &str) -> UploadMappingModel {
        UploadMappingModel {
            folder: AttrValue::known(id),
            id: AttrValue::known(id),
            template: AttrValue::Unknown,
        }
    }

    fn import_verify_ignore() -> &'static [&'static str] {
        &["template"]
    }
}

pub struct UploadMappingDataSource;

#[async_trait]
impl DataSourceKind for UploadMappingDataSource {
    type Model = UploadMappingLookup;

    const TYPE_NAME: &'static str = ADMIN_UPLOAD_MAPPING;
    const NOUN: &'static str = "upload mapping";

    async fn read(
        &self,
        client: &dyn AdminApi,
        config: &UploadMappingLookup,
    ) -> Result<UploadMappingLookup, AdminError> {
        let folder = config.folder.as_str();
        let remote = client.get_upload_mapping(folder).await?;
        Ok(UploadMappingLookup {
            folder: AttrValue::known(folder),
            id: AttrValue::known(folder),
            template: AttrValue::known(remote.template),
        })
    }
}
