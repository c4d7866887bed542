//! Admin API trait definition

use crate::error::Result;
use crate::models::{UploadMapping, Usage};
use async_trait::async_trait;

#[cfg(any(test, feature = "mock"))]
use mockall::automock;

/// Account-level Admin API operations used by cldform.
///
/// Every method is one round trip with no retry. Errors come back through a
/// single [`crate::AdminError`] so callers test once per call.
#[cfg_attr(any(test, feature = "mock"), automock)]
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Create a mapping from `folder` to `template`
    async fn create_upload_mapping(&self, folder: &str, template: &str) -> Result<UploadMapping>;

    /// Fetch the mapping for `folder`
    async fn get_upload_mapping(&self, folder: &str) -> Result<UploadMapping>;

    /// Point an existing `folder` at a new `template`
    async fn update_upload_mapping(&self, folder: &str, template: &str) -> Result<UploadMapping>;

    /// Delete the mapping for `folder`
    async fn delete_upload_mapping(&self, folder: &str) -> Result<()>;

    /// Fetch the account usage report
    async fn usage(&self) -> Result<Usage>;
}
