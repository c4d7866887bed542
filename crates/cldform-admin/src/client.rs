//! Cloudinary Admin API client
//!
//! Direct Admin API implementation over HTTPS.
//! Uses HTTP basic authentication with the account's API key and secret.

use crate::api::AdminApi;
use crate::credentials::Credentials;
use crate::error::{AdminError, Result};
use crate::models::{UploadMapping, Usage};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Admin API client bound to one product environment
pub struct AdminClient {
    client: reqwest::Client,
    api_base: String,
    credentials: Credentials,
}

impl AdminClient {
    /// Create a new client. Fails if any credential component is empty.
    pub fn new(credentials: Credentials) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("cldform/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: CLOUDINARY_API_BASE.to_string(),
            credentials,
        })
    }

    /// Point the client at another API root (e.g. a local mock server)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn cloud_name(&self) -> &str {
        &self.credentials.cloud_name
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.api_base, self.credentials.cloud_name, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        decode_response(status, &body)
    }
}

/// Decode an Admin API response body.
///
/// A non-empty `error.message` wins over everything else, whatever the status.
fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|_| {
        AdminError::Transport(format!(
            "unexpected response (HTTP {}): {}",
            status,
            body.trim()
        ))
    })?;

    if let Some(message) = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
    {
        return Err(AdminError::Api(message.to_string()));
    }

    if !status.is_success() {
        return Err(AdminError::Api(format!("HTTP {}", status)));
    }

    serde_json::from_value(value)
        .map_err(|e| AdminError::Transport(format!("failed to decode response: {}", e)))
}

#[async_trait]
impl AdminApi for AdminClient {
    async fn create_upload_mapping(&self, folder: &str, template: &str) -> Result<UploadMapping> {
        tracing::info!(folder, template, "Creating upload mapping");

        let request = self
            .client
            .post(self.endpoint("upload_mappings"))
            .form(&[("folder", folder), ("template", template)]);

        match self.send::<MessageResponse>(request).await {
            Ok(res) => {
                tracing::info!(folder, message = %res.message, "Created upload mapping");
                Ok(UploadMapping {
                    folder: folder.to_string(),
                    template: template.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(error = %e, folder, "Failed to create upload mapping");
                Err(e)
            }
        }
    }

    async fn get_upload_mapping(&self, folder: &str) -> Result<UploadMapping> {
        tracing::info!(folder, "Fetching upload mapping");

        let request = self
            .client
            .get(self.endpoint("upload_mappings"))
            .query(&[("folder", folder)]);

        match self.send::<UploadMapping>(request).await {
            Ok(mapping) => {
                tracing::info!(folder = %mapping.folder, "Fetched upload mapping");
                Ok(mapping)
            }
            Err(e) => {
                tracing::error!(error = %e, folder, "Failed to fetch upload mapping");
                Err(e)
            }
        }
    }

    async fn update_upload_mapping(&self, folder: &str, template: &str) -> Result<UploadMapping> {
        tracing::info!(folder, template, "Updating upload mapping");

        let request = self
            .client
            .put(self.endpoint("upload_mappings"))
            .form(&[("folder", folder), ("template", template)]);

        match self.send::<MessageResponse>(request).await {
            Ok(res) => {
                tracing::info!(folder, message = %res.message, "Updated upload mapping");
                Ok(UploadMapping {
                    folder: folder.to_string(),
                    template: template.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(error = %e, folder, "Failed to update upload mapping");
                Err(e)
            }
        }
    }

    async fn delete_upload_mapping(&self, folder: &str) -> Result<()> {
        tracing::info!(folder, "Deleting upload mapping");

        let request = self
            .client
            .delete(self.endpoint("upload_mappings"))
            .query(&[("folder", folder)]);

        match self.send::<MessageResponse>(request).await {
            Ok(_) => {
                tracing::info!(folder, "Deleted upload mapping");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, folder, "Failed to delete upload mapping");
                Err(e)
            }
        }
    }

    async fn usage(&self) -> Result<Usage> {
        tracing::info!(cloud_name = %self.credentials.cloud_name, "Fetching usage report");

        let request = self.client.get(self.endpoint("usage"));

        match self.send::<Usage>(request).await {
            Ok(usage) => {
                tracing::info!(plan = %usage.plan, "Fetched usage report");
                Ok(usage)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch usage report");
                Err(e)
            }
        }
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}
