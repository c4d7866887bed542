use crate::config::DesiredConfig;
use crate::utils;
use cldform_provider::{ActionType, Plan, StateManager, plan_mappings};
use colored::Colorize;
use std::path::Path;

pub async fn handle(config_file: &Path, project_root: &Path) -> anyhow::Result<()> {
    let config = DesiredConfig::load(config_file)?;
    let provider = utils::configure_provider(&config)?;
    let controller = utils::require(provider.upload_mapping_resource())?;

    let manager = StateManager::new(project_root);
    let mut state = manager.load().await?;

    println!("{}", "Refreshing tracked mappings...".blue());
    let refresh = utils::refresh_mappings(&controller, &mut state).await;
    utils::print_diagnostics(&refresh.diagnostics);

    let plan = utils::require(plan_mappings(&config.desired_mappings(), &state))?;
    print_plan(&plan);
    for key in refresh.failed.keys() {
        println!("  {} {} was planned against its last known state", "!".red(), key.cyan());
    }
    refresh.check()
}

pub fn print_plan(plan: &Plan) {
    println!();
    if !plan.has_changes {
        println!("{}", "No changes. Remote account matches the configuration.".green());
        return;
    }

    println!("{}", "Planned changes:".bold());
    for action in plan.changes() {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Update => "~".yellow(),
            ActionType::Replace => "-/+".magenta(),
            ActionType::Delete => "-".red(),
            ActionType::Import => "<=".cyan(),
            ActionType::NoOp => " ".normal(),
        };
        println!("  {} {}", marker, action.id.cyan());

        let mut attributes: Vec<_> = action.details.iter().collect();
        attributes.sort_by(|a, b| a.0.cmp(b.0));
        for (name, change) in attributes {
            println!(
                "      {}: {} => {}",
                name,
                describe(&change["from"]),
                describe(&change["to"])
            );
        }
    }
    println!();
    println!("Plan: {}", plan.summary());
}

/// Render a persisted attribute value
fn describe(value: &serde_json::Value) -> String {
    match value.get("state").and_then(|s| s.as_str()) {
        Some("known") => value["value"].to_string(),
        Some("unknown") => "(known after apply)".to_string(),
        _ => "null".to_string(),
    }
}
