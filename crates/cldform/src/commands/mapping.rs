use crate::config::DesiredConfig;
use crate::utils;
use cldform_provider::{ObjectState, UploadMappingLookup};
use std::path::Path;

pub async fn handle(config_file: &Path, folder: &str) -> anyhow::Result<()> {
    let config = DesiredConfig::load_or_default(config_file)?;
    let provider = utils::configure_provider(&config)?;
    let data_source = utils::require(provider.upload_mapping_data_source())?;

    let query = utils::require(ObjectState::from_record(
        data_source.type_name(),
        &UploadMappingLookup::folder(folder),
    ))?;
    let resp = data_source.read(&query).await;
    utils::check(&resp.diagnostics)?;
    let Some(found) = resp.state else {
        anyhow::bail!("lookup returned no state for {}", folder);
    };

    utils::require(found.get::<UploadMappingLookup>())?;
    println!("{}", serde_json::to_string_pretty(&utils::plain_json(&found))?);
    Ok(())
}
