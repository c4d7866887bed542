//! Provider configuration and credential resolution
//!
//! The provider is configured once per process. Resolution goes, per field:
//! explicit value, then environment variable. A complete cloud name, key and
//! secret triad takes precedence over the environment connection URL. The
//! resolved client is handed to every controller at construction time.

use crate::diag::{Diagnostics, UNABLE_TO_CREATE_CLIENT};
use crate::reconcile::{DataSourceController, ResourceController};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::{ObjectState, Record};
use crate::upload_mapping::{UploadMappingDataSource, UploadMappingResource};
use crate::usage::UsageDataSource;
use crate::value::AttrValue;
use cldform_admin::{AdminApi, AdminClient, AdminError, Credentials};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

pub const ENV_CLOUD_NAME: &str = "CLOUDINARY_CLOUD_NAME";
pub const ENV_API_KEY: &str = "CLOUDINARY_API_KEY";
pub const ENV_API_SECRET: &str = "CLOUDINARY_API_SECRET";
pub const ENV_URL: &str = "CLOUDINARY_URL";

pub const UPLOAD_MAPPING: &str = "cloudinary_upload_mapping";
pub const ADMIN_UPLOAD_MAPPING: &str = "cloudinary_admin_upload_mapping";
pub const USAGE: &str = "cloudinary_usage";
pub const ADMIN_USAGE: &str = "cloudinary_admin_usage";

/// Provider block of the configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub cloud_name: AttrValue<String>,
    pub api_key: AttrValue<String>,
    pub api_secret: AttrValue<String>,
    pub cloudinary_url: AttrValue<String>,
}

impl Record for ProviderConfig {
    fn schema() -> Schema {
        Schema::new("Cloudinary account credentials.")
            .with_attribute(
                "api_key",
                Attribute::optional_computed(AttributeType::String).sensitive(),
            )
            .with_attribute(
                "api_secret",
                Attribute::optional_computed(AttributeType::String).sensitive(),
            )
            .with_attribute(
                "cloud_name",
                Attribute::optional_computed(AttributeType::String),
            )
            .with_attribute(
                "cloudinary_url",
                Attribute::optional_computed(AttributeType::String).sensitive(),
            )
    }
}

/// Source of fallback values for absent configuration fields
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Outcome of credential resolution
#[derive(Debug)]
pub enum Resolution {
    Resolved(Credentials),
    /// A field is not known yet; retry on a later pass
    Deferred(Diagnostics),
    /// The configuration can never produce a client
    Failed(Diagnostics),
}

/// Resolve credentials from the provider configuration.
pub fn resolve_credentials(config: &ProviderConfig, env: &dyn Environment) -> Resolution {
    let fields = [
        ("cloud_name", &config.cloud_name),
        ("api_key", &config.api_key),
        ("api_secret", &config.api_secret),
        ("cloudinary_url", &config.cloudinary_url),
    ];

    for (name, value) in fields {
        if value.is_unknown() {
            let mut diags = Diagnostics::new();
            diags.add_warning(
                UNABLE_TO_CREATE_CLIENT,
                format!("Cannot use unknown value as {}", name),
            );
            return Resolution::Deferred(diags);
        }
    }

    let triad = [
        ("cloud_name", &config.cloud_name, ENV_CLOUD_NAME),
        ("api_key", &config.api_key, ENV_API_KEY),
        ("api_secret", &config.api_secret, ENV_API_SECRET),
    ];

    let mut diags = Diagnostics::new();
    let mut resolved = Vec::with_capacity(triad.len());
    for (name, value, env_name) in triad {
        let v = match value {
            AttrValue::Known(v) => {
                if v.is_empty() {
                    diags.add_attribute_error(
                        name,
                        "Invalid Configuration",
                        format!("{} is set to an empty string", name),
                    );
                }
                v.clone()
            }
            _ => env.var(env_name).unwrap_or_default(),
        };
        resolved.push((name, env_name, v));
    }
    if diags.has_error() {
        return Resolution::Failed(diags);
    }

    let triad_complete = resolved.iter().all(|(_, _, v)| !v.is_empty());

    let parsed = match &config.cloudinary_url {
        AttrValue::Known(url) => Some(Credentials::from_url(url)),
        _ if triad_complete => {
            tracing::debug!("Using cloud_name, api_key and api_secret as given");
            let [cloud_name, api_key, api_secret] =
                [0, 1, 2].map(|i| resolved[i].2.clone());
            Some(Ok(Credentials::new(cloud_name, api_key, api_secret)))
        }
        _ => env
            .var(ENV_URL)
            .filter(|u| !u.is_empty())
            .map(|url| Credentials::from_url(&url)),
    };

    let Some(parsed) = parsed else {
        for (name, env_name, value) in &resolved {
            if value.is_empty() {
                diags.add_attribute_error(
                    *name,
                    "Invalid Configuration",
                    format!(
                        "{} resolved to an empty value. Set it in the provider configuration, \
                         through the {} environment variable, or provide cloudinary_url / {}.",
                        name, env_name, ENV_URL
                    ),
                );
            }
        }
        return Resolution::Failed(diags);
    };

    match parsed {
        Ok(credentials) => Resolution::Resolved(credentials),
        Err(e) => {
            diags.add_error(
                UNABLE_TO_CREATE_CLIENT,
                format!("Unable to create cloudinary client:\n\n{}", e),
            );
            Resolution::Failed(diags)
        }
    }
}

/// Builds the remote client once credentials are known
pub type ClientFactory =
    Box<dyn Fn(Credentials) -> Result<Arc<dyn AdminApi>, AdminError> + Send + Sync>;

fn default_client_factory() -> ClientFactory {
    Box::new(|credentials| {
        let client = AdminClient::new(credentials)?;
        Ok(Arc::new(client) as Arc<dyn AdminApi>)
    })
}

/// The Cloudinary provider: resolves credentials once and hands out
/// controllers bound to the resulting client.
pub struct CloudinaryProvider {
    version: String,
    factory: ClientFactory,
    client: OnceLock<Arc<dyn AdminApi>>,
}

impl CloudinaryProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            factory: default_client_factory(),
            client: OnceLock::new(),
        }
    }

    pub fn with_client_factory(mut self, factory: ClientFactory) -> Self {
        self.factory = factory;
        self
    }

    /// A provider that is already configured with `client`
    pub fn with_client(version: impl Into<String>, client: Arc<dyn AdminApi>) -> Self {
        let provider = Self::new(version);
        let _ = provider.client.set(client);
        provider
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn schema() -> Schema {
        ProviderConfig::schema()
    }

    pub fn resource_types() -> &'static [&'static str] {
        &[UPLOAD_MAPPING, ADMIN_UPLOAD_MAPPING]
    }

    pub fn data_source_types() -> &'static [&'static str] {
        &[UPLOAD_MAPPING, ADMIN_UPLOAD_MAPPING, USAGE, ADMIN_USAGE]
    }

    pub fn is_configured(&self) -> bool {
        self.client.get().is_some()
    }

    /// Resolve credentials and build the client.
    ///
    /// Returns warnings only when a value is still unknown; the provider stays
    /// unconfigured and configure may be called again later.
    pub fn configure(&self, config: &ObjectState, env: &dyn Environment) -> Diagnostics {
        let mut diags = Diagnostics::new();

        if self.is_configured() {
            diags.add_warning(
                "Provider Already Configured",
                "The provider was configured earlier in this run; the existing client is reused.",
            );
            return diags;
        }

        let data = match config.get::<ProviderConfig>() {
            Ok(data) => data,
            Err(d) => {
                diags.append(d);
                return diags;
            }
        };

        let credentials = match resolve_credentials(&data, env) {
            Resolution::Resolved(credentials) => credentials,
            Resolution::Deferred(d) | Resolution::Failed(d) => {
                diags.append(d);
                return diags;
            }
        };

        let cloud_name = credentials.cloud_name.clone();
        let client = match (self.factory)(credentials) {
            Ok(client) => client,
            Err(e) => {
                diags.add_error(
                    UNABLE_TO_CREATE_CLIENT,
                    format!("Unable to create cloudinary client:\n\n{}", e),
                );
                return diags;
            }
        };

        if self.client.set(client).is_err() {
            diags.add_warning(
                "Provider Already Configured",
                "The provider was configured concurrently; the first client is kept.",
            );
            return diags;
        }

        tracing::info!(cloud_name = %cloud_name, version = %self.version, "Configured provider");
        diags
    }

    /// The configured client
    pub fn client(&self) -> Result<Arc<dyn AdminApi>, Diagnostics> {
        match self.client.get() {
            Some(client) => Ok(Arc::clone(client)),
            None => {
                let mut diags = Diagnostics::new();
                diags.add_error(
                    "Unconfigured Provider",
                    "The provider has not been configured yet, so no resource or data source \
                     can reach the remote account. Configure the provider before use.",
                );
                Err(diags)
            }
        }
    }

    pub fn upload_mapping_resource(
        &self,
    ) -> Result<ResourceController<UploadMappingResource>, Diagnostics> {
        Ok(ResourceController::new(UploadMappingResource, self.client()?))
    }

    pub fn upload_mapping_data_source(
        &self,
    ) -> Result<DataSourceController<UploadMappingDataSource>, Diagnostics> {
        Ok(DataSourceController::new(
            UploadMappingDataSource,
            self.client()?,
        ))
    }

    pub fn usage_data_source(&self) -> Result<DataSourceController<UsageDataSource>, Diagnostics> {
        Ok(DataSourceController::new(UsageDataSource, self.client()?))
    }
}
