//! Usage snapshot data source

use crate::provider::ADMIN_USAGE;
use crate::reconcile::DataSourceKind;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::Record;
use crate::value::AttrValue;
use async_trait::async_trait;
use cldform_admin::{AdminApi, AdminError, MediaLimits, Usage, UsageMetric};
use serde::{Deserialize, Serialize};

/// Identifier of the account-wide snapshot
pub const USAGE_ID: &str = "usage";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricModel {
    pub limit: i64,
    pub usage: i64,
    pub used_percent: f64,
}

impl<N: Into<i64>> From<UsageMetric<N>> for MetricModel {
    fn from(metric: UsageMetric<N>) -> Self {
        Self {
            limit: metric.limit.into(),
            usage: metric.usage.into(),
            used_percent: metric.used_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLimitsModel {
    pub image_max_size_bytes: i64,
    pub video_max_size_bytes: i64,
    pub raw_max_size_bytes: i64,
    pub image_max_px: i64,
    pub asset_max_total_px: i64,
}

impl From<MediaLimits> for MediaLimitsModel {
    fn from(limits: MediaLimits) -> Self {
        Self {
            image_max_size_bytes: limits.image_max_size_bytes,
            video_max_size_bytes: limits.video_max_size_bytes,
            raw_max_size_bytes: limits.raw_max_size_bytes,
            image_max_px: limits.image_max_px,
            asset_max_total_px: limits.asset_max_total_px,
        }
    }
}

/// Tracked usage snapshot. Every read replaces the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageModel {
    pub id: AttrValue<String>,
    pub plan: AttrValue<String>,
    pub last_updated: AttrValue<String>,
    pub requests: AttrValue<i64>,
    pub resources: AttrValue<i64>,
    pub derived_resources: AttrValue<i64>,
    pub bandwidth: AttrValue<MetricModel>,
    pub objects: AttrValue<MetricModel>,
    pub storage: AttrValue<MetricModel>,
    pub transformations: AttrValue<MetricModel>,
    pub media_limits: AttrValue<MediaLimitsModel>,
}

fn metric_type() -> AttributeType {
    AttributeType::object([
        ("limit", AttributeType::Int64),
        ("usage", AttributeType::Int64),
        ("used_percent", AttributeType::Float64),
    ])
}

impl Record for UsageModel {
    fn schema() -> Schema {
        let int = || Attribute::computed(AttributeType::Int64);
        let metric = || Attribute::computed(metric_type());

        Schema::new("Usage and quota report of the account.")
            .with_attribute("id", Attribute::computed(AttributeType::String))
            .with_attribute("plan", Attribute::computed(AttributeType::String))
            .with_attribute("last_updated", Attribute::computed(AttributeType::String))
            .with_attribute("requests", int())
            .with_attribute("resources", int())
            .with_attribute("derived_resources", int())
            .with_attribute("bandwidth", metric())
            .with_attribute("objects", metric())
            .with_attribute("storage", metric())
            .with_attribute("transformations", metric())
            .with_attribute(
                "media_limits",
                Attribute::computed(AttributeType::object([
                    ("image_max_size_bytes", AttributeType::Int64),
                    ("video_max_size_bytes", AttributeType::Int64),
                    ("raw_max_size_bytes", AttributeType::Int64),
                    ("image_max_px", AttributeType::Int64),
                    ("asset_max_total_px", AttributeType::Int64),
                ])),
            )
    }
}

/// Copy a usage report field by field into the tracked shape.
///
/// Counters are carried as `i64` end to end, so nothing is rounded or clipped.
pub fn flatten_usage(usage: Usage) -> UsageModel {
    UsageModel {
        id: AttrValue::known(USAGE_ID),
        plan: AttrValue::known(usage.plan),
        last_updated: AttrValue::known(usage.last_updated),
        requests: AttrValue::known(usage.requests),
        resources: AttrValue::known(usage.resources),
        derived_resources: AttrValue::known(usage.derived_resources),
        bandwidth: AttrValue::known(MetricModel::from(usage.bandwidth)),
        objects: AttrValue::known(MetricModel::from(usage.objects)),
        storage: AttrValue::known(MetricModel::from(usage.storage)),
        transformations: AttrValue::known(MetricModel::from(usage.transformations)),
        media_limits: AttrValue::known(MediaLimitsModel::from(usage.media_limits)),
    }
}

pub struct UsageDataSource;

#[async_trait]
impl DataSourceKind for UsageDataSource {
    type Model = UsageModel;

    const TYPE_NAME: &'static str = ADMIN_USAGE;
    const NOUN: &'static str = "usage";

    async fn read(
        &self,
        client: &dyn AdminApi,
        _config: &UsageModel,
    ) -> Result<UsageModel, AdminError> {
        let usage = client.usage().await?;
        Ok(flatten_usage(usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::DataSourceController;
    use crate::state::ObjectState;
    use cldform_admin::MockAdminApi;
    use std::sync::Arc;

    fn free_plan() -> Usage {
        Usage {
            plan: "Free".to_string(),
            last_updated: "2022-03-14".to_string(),
            transformations: UsageMetric {
                limit: 25000,
                usage: 12,
                used_percent: 0.05,
            },
            objects: UsageMetric {
                limit: 5000,
                usage: 143,
                used_percent: 2.86,
            },
            bandwidth: UsageMetric {
                limit: 1000,
                usage: 10,
                used_percent: 1.0,
            },
            storage: UsageMetric {
                limit: 26_843_545_600,
                usage: 8_589_934_592,
                used_percent: 32.0,
            },
            requests: 1200,
            resources: 143,
            derived_resources: 7,
            media_limits: MediaLimits {
                image_max_size_bytes: 10_485_760,
                video_max_size_bytes: 104_857_600,
                raw_max_size_bytes: 10_485_760,
                image_max_px: 25_000_000,
                asset_max_total_px: 50_000_000,
            },
        }
    }

    #[test]
    fn test_flatten_usage() {
        let model = flatten_usage(free_plan());
        assert_eq!(model.id.as_str(), USAGE_ID);
        assert_eq!(model.plan.as_str(), "Free");
        assert_eq!(
            model.bandwidth,
            AttrValue::Known(MetricModel {
                limit: 1000,
                usage: 10,
                used_percent: 1.0,
            })
        );
        assert_eq!(model.storage.as_known().unwrap().usage, 8_589_934_592);
        assert_eq!(model.objects.as_known().unwrap().used_percent, 2.86);
        assert_eq!(model.resources, AttrValue::Known(143));
        assert_eq!(model.derived_resources, AttrValue::Known(7));
        assert_eq!(
            model.media_limits.as_known().unwrap().asset_max_total_px,
            50_000_000
        );
    }

    #[tokio::test]
    async fn test_read_usage() {
        let mut mock = MockAdminApi::new();
        mock.expect_usage().times(1).returning(|| Ok(free_plan()));
        let ctl = DataSourceController::new(UsageDataSource, Arc::new(mock));

        let resp = ctl.read(&ObjectState::new(ADMIN_USAGE)).await;
        assert!(!resp.has_error(), "{}", resp.diagnostics);
        let state = resp.state.unwrap();
        assert_eq!(state.id().as_deref(), Some(USAGE_ID));
        assert_eq!(state.get::<UsageModel>().unwrap(), flatten_usage(free_plan()));
    }

    #[tokio::test]
    async fn test_read_error_writes_nothing() {
        let mut mock = MockAdminApi::new();
        mock.expect_usage()
            .returning(|| Err(AdminError::Api("Invalid credentials".to_string())));
        let ctl = DataSourceController::new(UsageDataSource, Arc::new(mock));

        let resp = ctl.read(&ObjectState::new(ADMIN_USAGE)).await;
        assert!(resp.state.is_none());
        let err = resp.diagnostics.errors().next().unwrap();
        assert_eq!(err.summary, "Client Error");
        assert_eq!(
            err.detail,
            "Unable to read usage, got error: Invalid credentials"
        );
    }

    #[test]
    fn test_flatten_keeps_counters_above_i32() {
        let mut usage = free_plan();
        usage.objects.usage = 5_000_000_000;
        usage.resources = 3_000_000_000;
        usage.media_limits.video_max_size_bytes = 2_147_483_648;

        let model = flatten_usage(usage);
        assert_eq!(model.objects.as_known().unwrap().usage, 5_000_000_000);
        assert_eq!(model.resources, AttrValue::Known(3_000_000_000));
        assert_eq!(
            model.media_limits.as_known().unwrap().video_max_size_bytes,
            2_147_483_648
        );
    }

    #[tokio::test]
    async fn test_read_transport_error_writes_nothing() {
        let mut mock = MockAdminApi::new();
        mock.expect_usage()
            .returning(|| Err(AdminError::Transport("connection reset".to_string())));
        let ctl = DataSourceController::new(UsageDataSource, Arc::new(mock));

        let resp = ctl.read(&ObjectState::new(ADMIN_USAGE)).await;
        assert!(resp.state.is_none());
        let err = resp.diagnostics.errors().next().unwrap();
        assert_eq!(err.summary, "Client Error");
        assert_eq!(err.detail, "Unable to read usage, got error: connection reset");
    }

    #[tokio::test]
    async fn test_config_cannot_set_computed_fields() {
        let mock = MockAdminApi::new();
        let ctl = DataSourceController::new(UsageDataSource, Arc::new(mock));
        let mut config = ObjectState::new(ADMIN_USAGE);
        config.set(&UsageModel {
            plan: AttrValue::known("Plus"),
            ..Default::default()
        });
        assert!(ctl.read(&config).await.has_error());
    }
}
