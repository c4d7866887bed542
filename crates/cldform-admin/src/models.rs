//! Wire models returned by the Admin API

use serde::{Deserialize, Serialize};

/// Folder to URL template mapping used for auto-upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMapping {
    pub folder: String,
    pub template: String,
}

/// Usage and quota report of the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub plan: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub transformations: UsageMetric<i64>,
    #[serde(default)]
    pub objects: UsageMetric<i64>,
    #[serde(default)]
    pub bandwidth: UsageMetric<i64>,
    #[serde(default)]
    pub storage: UsageMetric<i64>,
    #[serde(default)]
    pub requests: i64,
    #[serde(default)]
    pub resources: i64,
    #[serde(default)]
    pub derived_resources: i64,
    #[serde(default)]
    pub media_limits: MediaLimits,
}

/// A single metered quantity.
///
/// `N` is the counter width the API uses for this metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetric<N> {
    #[serde(default)]
    pub limit: N,
    #[serde(default)]
    pub usage: N,
    #[serde(default)]
    pub used_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLimits {
    #[serde(default)]
    pub image_max_size_bytes: i64,
    #[serde(default)]
    pub video_max_size_bytes: i64,
    #[serde(default)]
    pub raw_max_size_bytes: i64,
    #[serde(default)]
    pub image_max_px: i64,
    #[serde(default)]
    pub asset_max_total_px: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_decode() {
        let body = serde_json::json!({
            "plan": "Free",
            "last_updated": "2022-03-14",
            "transformations": {"usage": 12, "limit": 25000, "used_percent": 0.05},
            "objects": {"usage": 143, "limit": 5000, "used_percent": 2.86},
            "bandwidth": {"usage": 10, "limit": 1000, "used_percent": 1.0},
            "storage": {"usage": 8_589_934_592_i64, "limit": 26_843_545_600_i64, "used_percent": 32.0},
            "requests": 1200,
            "resources": 143,
            "derived_resources": 7,
            "media_limits": {
                "image_max_size_bytes": 10485760,
                "video_max_size_bytes": 104857600,
                "raw_max_size_bytes": 10485760,
                "image_max_px": 25000000,
                "asset_max_total_px": 50000000
            }
        });

        let usage: Usage = serde_json::from_value(body).unwrap();
        assert_eq!(usage.plan, "Free");
        assert_eq!(usage.bandwidth.limit, 1000);
        assert_eq!(usage.storage.usage, 8_589_934_592);
        assert_eq!(usage.media_limits.image_max_px, 25_000_000);
    }

    #[test]
    fn test_usage_decode_large_counters() {
        let body = serde_json::json!({
            "plan": "Advanced",
            "objects": {"usage": 5_000_000_000_i64, "limit": 10_000_000_000_i64, "used_percent": 50.0},
            "resources": 3_000_000_000_i64,
            "media_limits": {"video_max_size_bytes": 2_147_483_648_i64}
        });

        let usage: Usage = serde_json::from_value(body).unwrap();
        assert_eq!(usage.objects.usage, 5_000_000_000);
        assert_eq!(usage.resources, 3_000_000_000);
        assert_eq!(usage.media_limits.video_max_size_bytes, 2_147_483_648);
        assert_eq!(usage.derived_resources, 0);
    }
}
