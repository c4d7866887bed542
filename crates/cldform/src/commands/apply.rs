use crate::commands::plan::print_plan;
use crate::config::DesiredConfig;
use crate::utils;
use cldform_provider::provider::UPLOAD_MAPPING;
use cldform_provider::{
    Action, ActionType, ApplyResult, ObjectState, Plan, ResourceController, StateFile,
    StateManager, UploadMappingModel, UploadMappingResource, plan_mappings,
};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

pub async fn handle(config_file: &Path, project_root: &Path, yes: bool) -> anyhow::Result<()> {
    let config = DesiredConfig::load(config_file)?;
    let provider = utils::configure_provider(&config)?;
    let controller = utils::require(provider.upload_mapping_resource())?;

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    println!("{}", "Refreshing tracked mappings...".blue());
    let refresh = utils::refresh_mappings(&controller, &mut state).await;
    utils::print_diagnostics(&refresh.diagnostics);
    manager.save(&state).await?;

    let desired = config.desired_mappings();
    let plan = utils::require(plan_mappings(&desired, &state))?;
    print_plan(&plan);

    if !plan.has_changes {
        lock.release().await?;
        return refresh.check();
    }

    if !yes {
        println!();
        println!("{}", "Run with --yes to apply these changes".yellow());
        lock.release().await?;
        return refresh.check();
    }

    println!();
    let started = Instant::now();
    let mut result = ApplyResult::new();
    for action in runnable(&plan, &refresh, &mut result) {
        execute(
            &controller,
            &manager,
            &mut state,
            &desired,
            action,
            &mut result,
        )
        .await?;
    }
    result.duration_ms = started.elapsed().as_millis() as u64;

    lock.release().await?;
    print_result("Apply", &result)?;
    refresh.check()
}

/// Changes whose tracked object refreshed cleanly.
///
/// Changes to objects that could not be refreshed are recorded as failures
/// with the refresh diagnostics and left out.
pub(crate) fn runnable<'a>(
    plan: &'a Plan,
    refresh: &utils::Refresh,
    result: &mut ApplyResult,
) -> Vec<&'a Action> {
    let mut runnable = Vec::new();
    for action in plan.changes() {
        match refresh.failed.get(&action.id) {
            Some(diags) => {
                println!(
                    "{} {} {}",
                    format!("{}:", action.action_type).bold(),
                    action.id.cyan(),
                    "(skipped, refresh failed)".red()
                );
                result.add_failure(action.id.clone(), diags);
            }
            None => runnable.push(action),
        }
    }
    runnable
}

/// Run one planned action, saving state right after it succeeds
pub(crate) async fn execute(
    controller: &ResourceController<UploadMappingResource>,
    manager: &StateManager,
    state: &mut StateFile,
    desired: &BTreeMap<String, UploadMappingModel>,
    action: &Action,
    result: &mut ApplyResult,
) -> anyhow::Result<()> {
    println!("{} {}", format!("{}:", action.action_type).bold(), action.id.cyan());

    let prior = state.get_object(&action.id).cloned();
    let config = desired
        .get(&action.resource_name)
        .map(|model| ObjectState::from_record(UPLOAD_MAPPING, model));

    let outcome = match (action.action_type, prior, config) {
        (ActionType::Create, _, Some(Ok(config))) => controller.create(&config).await,
        (ActionType::Update, Some(prior), Some(Ok(config))) => {
            controller.update(&config, &prior).await
        }
        (ActionType::Replace, Some(prior), Some(Ok(config))) => {
            let deleted = controller.delete(&prior).await;
            if deleted.has_error() {
                deleted
            } else {
                state.remove_object(&action.id);
                manager.save(state).await?;
                controller.create(&config).await
            }
        }
        (ActionType::Delete, Some(prior), _) => controller.delete(&prior).await,
        (_, _, Some(Err(diags))) => {
            utils::print_diagnostics(&diags);
            result.add_failure(action.id.clone(), &diags);
            return Ok(());
        }
        (action_type, _, _) => {
            anyhow::bail!("cannot {} {}: nothing to act on", action_type, action.id)
        }
    };

    utils::print_diagnostics(&outcome.diagnostics);
    match outcome.state {
        Some(new_state) if !outcome.diagnostics.has_error() => {
            state.apply(action.id.clone(), new_state);
            manager.save(state).await?;
            println!("  {} {}", "✓".green(), action.description);
            result.add_success(action.id.clone(), action.description.clone());
        }
        _ => {
            println!("  {} {}", "✗".red(), action.description);
            result.add_failure(action.id.clone(), &outcome.diagnostics);
        }
    }
    Ok(())
}

pub(crate) fn print_result(operation: &str, result: &ApplyResult) -> anyhow::Result<()> {
    println!();
    println!(
        "{} complete: {} succeeded, {} failed ({} ms)",
        operation,
        result.succeeded.len().to_string().green(),
        result.failed.len().to_string().red(),
        result.duration_ms
    );
    if !result.is_success() {
        anyhow::bail!("{} action(s) failed", result.failed.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cldform_provider::Diagnostics;

    #[test]
    fn test_runnable_skips_unrefreshed_objects() {
        let mut desired = BTreeMap::new();
        desired.insert("assets".to_string(), UploadMappingModel::desired("assets", "a"));
        desired.insert("broken".to_string(), UploadMappingModel::desired("broken", "b"));
        let plan = plan_mappings(&desired, &StateFile::new()).unwrap();

        let broken = StateFile::key(UPLOAD_MAPPING, "broken");
        let mut diags = Diagnostics::new();
        diags.add_error("Client Error", "Unable to read upload mapping, got error: timed out");
        let mut refresh = utils::Refresh::default();
        refresh.failed.insert(broken.clone(), diags);

        let mut result = ApplyResult::new();
        let ids: Vec<_> = runnable(&plan, &refresh, &mut result)
            .into_iter()
            .map(|a| a.id.clone())
            .collect();

        assert_eq!(ids, vec![StateFile::key(UPLOAD_MAPPING, "assets")]);
        assert!(!result.is_success());
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].action_id, broken);
        assert!(
            result.failed[0]
                .error
                .as_deref()
                .unwrap()
                .contains("timed out")
        );
        assert!(print_result("Apply", &result).is_err());
    }
}
