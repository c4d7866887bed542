use crate::config::DesiredConfig;
use cldform_provider::{
    CloudinaryProvider, Diagnostics, ObjectState, ProcessEnv, ResourceController, Severity,
    StateFile, UploadMappingResource, provider::UPLOAD_MAPPING,
};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Print diagnostics to stderr
pub fn print_diagnostics(diags: &Diagnostics) {
    for diag in diags.iter() {
        let label = match diag.severity {
            Severity::Error => "Error:".red().bold(),
            Severity::Warning => "Warning:".yellow().bold(),
        };
        match &diag.attribute {
            Some(attribute) => eprintln!("{} {} ({})", label, diag.summary.bold(), attribute),
            None => eprintln!("{} {}", label, diag.summary.bold()),
        }
        for line in diag.detail.lines() {
            eprintln!("  {}", line);
        }
    }
}

/// Print diagnostics and turn any error into a failure
pub fn check(diags: &Diagnostics) -> anyhow::Result<()> {
    print_diagnostics(diags);
    if diags.has_error() {
        anyhow::bail!("{} error(s) reported", diags.errors().count());
    }
    Ok(())
}

/// Unwrap a result whose failure is reported as diagnostics
pub fn require<T>(result: Result<T, Diagnostics>) -> anyhow::Result<T> {
    result.or_else(|diags| {
        check(&diags)?;
        anyhow::bail!("operation failed without diagnostics")
    })
}

/// Configure the provider once for this run
pub fn configure_provider(config: &DesiredConfig) -> anyhow::Result<CloudinaryProvider> {
    let provider = CloudinaryProvider::new(env!("CARGO_PKG_VERSION"));
    let state = ObjectState::from_record("provider", &config.provider_config());
    let state = require(state)?;

    let diags = provider.configure(&state, &ProcessEnv);
    check(&diags)?;
    if !provider.is_configured() {
        anyhow::bail!("provider configuration is not known yet; nothing was done");
    }
    Ok(provider)
}

/// Project root: `--dir` if given, otherwise the directory holding the config file
pub fn project_root(dir: Option<PathBuf>, config_file: &Path) -> PathBuf {
    dir.unwrap_or_else(|| match config_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    })
}

/// Attribute values without their known/unknown/null wrapping
pub fn plain_json(state: &ObjectState) -> serde_json::Value {
    let attributes = state
        .attributes
        .iter()
        .map(|(name, encoded)| {
            let value = match encoded.get("state").and_then(|s| s.as_str()) {
                Some("known") => encoded
                    .get("value")
                    .cloned()
                    .unwrap_or(serde_json::Value::Null),
                _ => serde_json::Value::Null,
            };
            (name.clone(), value)
        })
        .collect();
    serde_json::Value::Object(attributes)
}

/// Outcome of refreshing tracked mappings
#[derive(Debug, Default)]
pub struct Refresh {
    /// Diagnostics of every read
    pub diagnostics: Diagnostics,
    /// Diagnostics of the reads that failed, by state key
    pub failed: BTreeMap<String, Diagnostics>,
}

impl Refresh {
    /// Fail if any tracked mapping could not be refreshed
    pub fn check(&self) -> anyhow::Result<()> {
        if !self.failed.is_empty() {
            anyhow::bail!(
                "{} tracked mapping(s) could not be refreshed",
                self.failed.len()
            );
        }
        Ok(())
    }
}

/// Refresh every tracked mapping from the remote account.
///
/// Objects whose read fails keep their tracked state and are listed in
/// `Refresh::failed`; the rest are refreshed regardless.
pub async fn refresh_mappings(
    controller: &ResourceController<UploadMappingResource>,
    state: &mut StateFile,
) -> Refresh {
    let mut refresh = Refresh::default();
    let tracked: Vec<(String, ObjectState)> = state
        .objects_of_type(UPLOAD_MAPPING)
        .map(|(name, object)| (name.to_string(), object.clone()))
        .collect();

    for (name, object) in tracked {
        let key = StateFile::key(UPLOAD_MAPPING, &name);
        let resp = controller.read(&object).await;
        match resp.state {
            Some(refreshed) if !resp.diagnostics.has_error() => {
                state.apply(key, refreshed);
            }
            _ => {
                tracing::warn!(key = %key, "Refresh failed, keeping tracked state");
                refresh.failed.insert(key, resp.diagnostics.clone());
            }
        }
        refresh.diagnostics.append(resp.diagnostics);
    }
    refresh
}
