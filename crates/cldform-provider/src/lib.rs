//! cldform Cloudinary provider
//!
//! This crate reconciles declared Cloudinary account settings with the
//! remote account and reports every outcome as diagnostics.
//!
//! # Managed objects
//!
//! - **Upload mapping** (resource): folder to URL template, identified by the folder
//! - **Upload mapping** (data source): look up the template of a folder
//! - **Usage** (data source): account usage and quota snapshot
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   cldform CLI                    │
//! │          (plan / apply / import / usage)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               cldform-provider                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  CloudinaryProvider (resolve once)        │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────────┐  ┌─────────────────────┐  │
//! │  │ ResourceController│  │DataSourceController│  │
//! │  └──────────────────┘  └─────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Diagnostics  │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ cldform-admin │
//!           │  (Admin API)  │
//!           └───────────────┘
//! ```

pub mod diag;
pub mod error;
pub mod plan;
pub mod provider;
pub mod reconcile;
pub mod schema;
pub mod state;
pub mod upload_mapping;
pub mod usage;
pub mod value;

// Re-exports
pub use diag::{CLIENT_ERROR, Diagnostic, Diagnostics, Severity, UNABLE_TO_CREATE_CLIENT};
pub use error::{ProviderError, Result};
pub use plan::{Action, ActionType, ApplyResult, Plan, PlanSummary, plan_mappings};
pub use provider::{
    ClientFactory, CloudinaryProvider, Environment, ProcessEnv, ProviderConfig, Resolution,
    resolve_credentials,
};
pub use reconcile::{
    DataSourceController, DataSourceKind, DataSourceResponse, ResourceController, ResourceKind,
    ResourceResponse,
};
pub use schema::{Attribute, AttributeType, Schema};
pub use state::{ObjectState, Record, StateFile, StateLock, StateManager};
pub use upload_mapping::{
    UploadMappingDataSource, UploadMappingLookup, UploadMappingModel, UploadMappingResource,
};
pub use usage::{UsageDataSource, UsageModel};
pub use value::AttrValue;
