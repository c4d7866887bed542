use crate::commands::apply::{execute, print_result};
use crate::config::DesiredConfig;
use crate::utils;
use cldform_provider::provider::UPLOAD_MAPPING;
use cldform_provider::{ApplyResult, Plan, StateManager, UploadMappingModel, plan_mappings};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

pub async fn handle(config_file: &Path, project_root: &Path, yes: bool) -> anyhow::Result<()> {
    let config = DesiredConfig::load_or_default(config_file)?;

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    // Planning against nothing desired deletes every tracked mapping.
    let nothing: BTreeMap<String, UploadMappingModel> = BTreeMap::new();
    let plan: Plan = utils::require(plan_mappings(&nothing, &state))?;
    if !plan.has_changes {
        println!("{}", "No tracked upload mappings.".green());
        lock.release().await?;
        return Ok(());
    }

    println!("{}", "Upload mappings to delete:".bold());
    for action in plan.changes() {
        println!("  {} {}", "-".red(), action.id.cyan());
    }

    if !yes {
        println!();
        println!("{}", "Run with --yes to delete these mappings".yellow());
        lock.release().await?;
        return Ok(());
    }

    let provider = utils::configure_provider(&config)?;
    let controller = utils::require(provider.upload_mapping_resource())?;

    println!();
    let started = Instant::now();
    let mut result = ApplyResult::new();
    for action in plan.changes() {
        execute(
            &controller,
            &manager,
            &mut state,
            &nothing,
            action,
            &mut result,
        )
        .await?;
    }
    result.duration_ms = started.elapsed().as_millis() as u64;

    tracing::info!(
        resource = UPLOAD_MAPPING,
        deleted = result.succeeded.len(),
        "Destroy finished"
    );
    lock.release().await?;
    print_result("Destroy", &result)
}
