use crate::config::DesiredConfig;
use crate::utils;
use cldform_provider::usage::USAGE_ID;
use cldform_provider::{ObjectState, StateFile, StateManager, UsageModel};
use std::path::Path;

pub async fn handle(config_file: &Path, project_root: &Path) -> anyhow::Result<()> {
    let config = DesiredConfig::load_or_default(config_file)?;
    let provider = utils::configure_provider(&config)?;
    let data_source = utils::require(provider.usage_data_source())?;

    let resp = data_source
        .read(&ObjectState::new(data_source.type_name()))
        .await;
    // On failure the stored snapshot is left as it was.
    utils::check(&resp.diagnostics)?;
    let Some(snapshot) = resp.state else {
        anyhow::bail!("usage read returned no state");
    };

    utils::require(snapshot.get::<UsageModel>())?;
    println!("{}", serde_json::to_string_pretty(&utils::plain_json(&snapshot))?);

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;
    state.set_object(StateFile::key(data_source.type_name(), USAGE_ID), snapshot);
    manager.save(&state).await?;
    lock.release().await?;
    Ok(())
}
