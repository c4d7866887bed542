use crate::commands::apply::print_result;
use crate::config::DesiredConfig;
use crate::utils;
use cldform_provider::provider::UPLOAD_MAPPING;
use cldform_provider::{
    Action, ApplyResult, Diagnostics, ObjectState, ResourceController, StateManager,
    UploadMappingModel, UploadMappingResource,
};
use colored::Colorize;
use std::path::Path;
use std::time::Instant;

pub async fn handle(
    config_file: &Path,
    project_root: &Path,
    name: &str,
    folder: &str,
) -> anyhow::Result<()> {
    let config = DesiredConfig::load_or_default(config_file)?;
    let provider = utils::configure_provider(&config)?;
    let controller = utils::require(provider.upload_mapping_resource())?;

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let action = Action::import(UPLOAD_MAPPING, name, folder);
    if state.get_object(&action.id).is_some() {
        anyhow::bail!("{} is already managed; remove it from state first", action.id);
    }

    println!("{} {}", format!("{}:", action.action_type).bold(), action.id.cyan());

    let started = Instant::now();
    let mut result = ApplyResult::new();
    match import_object(&controller, folder).await {
        Ok(imported) => {
            let model = utils::require(imported.get::<UploadMappingModel>())?;
            state.set_object(action.id.clone(), imported);
            manager.save(&state).await?;

            println!("  {} {}", "✓".green(), action.description);
            println!("    template = {}", model.template);
            let ignored = controller.import_verify_ignore();
            if !ignored.is_empty() {
                println!(
                    "    {}",
                    format!("not verified at import time: {}", ignored.join(", ")).dimmed()
                );
            }
            if !config.upload_mappings.contains_key(name) {
                println!(
                    "{}",
                    format!(
                        "Add upload_mappings.{} to {} or the next apply will delete it",
                        name,
                        config_file.display()
                    )
                    .yellow()
                );
            }
            result.add_success(action.id.clone(), action.description.clone());
        }
        Err(diags) => {
            utils::print_diagnostics(&diags);
            println!("  {} {}", "✗".red(), action.description);
            result.add_failure(action.id.clone(), &diags);
        }
    }
    result.duration_ms = started.elapsed().as_millis() as u64;

    lock.release().await?;
    print_result("Import", &result)
}

/// Seed the identity, then read the rest from the remote
async fn import_object(
    controller: &ResourceController<UploadMappingResource>,
    folder: &str,
) -> Result<ObjectState, Diagnostics> {
    let seeded = controller.import_state(folder);
    let seeded = match seeded.state {
        Some(state) if !seeded.diagnostics.has_error() => state,
        _ => return Err(seeded.diagnostics),
    };

    let read = controller.read(&seeded).await;
    match read.state {
        Some(state) if !read.diagnostics.has_error() => Ok(state),
        _ => Err(read.diagnostics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cldform_admin::{AdminError, MockAdminApi, UploadMapping};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_import_object_reads_after_seeding() {
        let mut mock = MockAdminApi::new();
        mock.expect_get_upload_mapping().times(1).returning(|folder| {
            Ok(UploadMapping {
                folder: folder.to_string(),
                template: "https://cdn.example.com/".to_string(),
            })
        });
        let controller = ResourceController::new(UploadMappingResource, Arc::new(mock));

        let imported = import_object(&controller, "assets").await.unwrap();
        let model = imported.get::<UploadMappingModel>().unwrap();
        assert_eq!(imported.id().as_deref(), Some("assets"));
        assert_eq!(model.template.as_str(), "https://cdn.example.com/");
    }

    #[tokio::test]
    async fn test_import_object_reports_read_failure() {
        let mut mock = MockAdminApi::new();
        mock.expect_get_upload_mapping()
            .returning(|_| Err(AdminError::Api("Folder missing not found".to_string())));
        let controller = ResourceController::new(UploadMappingResource, Arc::new(mock));

        let diags = import_object(&controller, "missing").await.unwrap_err();
        let action = Action::import(UPLOAD_MAPPING, "missing", "missing");
        let mut result = ApplyResult::new();
        result.add_failure(action.id.clone(), &diags);
        assert!(result.failed[0].error.as_deref().unwrap().contains("not found"));
        assert!(print_result("Import", &result).is_err());
    }

    #[tokio::test]
    async fn test_import_object_rejects_empty_identifier() {
        let controller =
            ResourceController::new(UploadMappingResource, Arc::new(MockAdminApi::new()));
        let diags = import_object(&controller, "").await.unwrap_err();
        assert!(diags.has_error());
    }
}
