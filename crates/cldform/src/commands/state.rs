use cldform_provider::StateManager;
use colored::Colorize;
use std::path::Path;

pub async fn handle(project_root: &Path) -> anyhow::Result<()> {
    let manager = StateManager::new(project_root);
    let state = manager.load().await?;

    println!("{} {}", "State:".bold(), manager.state_path().display());
    if state.objects.is_empty() {
        println!("  (no tracked objects)");
        return Ok(());
    }

    println!("  updated {}", state.updated_at.to_rfc3339());
    for (key, object) in &state.objects {
        match object.id() {
            Some(id) => println!("  • {} (id: {})", key.cyan(), id),
            None => println!("  • {}", key.cyan()),
        }
    }
    Ok(())
}
