//! Planned changes to managed resources

use crate::diag::Diagnostics;
use crate::provider::UPLOAD_MAPPING;
use crate::schema::Schema;
use crate::state::{ObjectState, Record, StateFile};
use crate::upload_mapping::UploadMappingModel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Represents a planned action for a managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// State key of the object, `type.name`
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type, e.g. `cloudinary_upload_mapping`
    pub resource_type: String,

    /// Name of the resource in the desired configuration
    pub resource_name: String,

    /// Description of the action
    pub description: String,

    /// Changed attributes as `{"from": ..., "to": ...}`
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    fn new(action_type: ActionType, resource_type: &str, name: &str, description: String) -> Self {
        Self {
            id: StateFile::key(resource_type, name),
            action_type,
            resource_type: resource_type.to_string(),
            resource_name: name.to_string(),
            description,
            details: HashMap::new(),
        }
    }

    /// Action recording the import of an existing remote object
    pub fn import(resource_type: &str, name: &str, id: &str) -> Self {
        Self::new(
            ActionType::Import,
            resource_type,
            name,
            format!("import {} as {}", id, name),
        )
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// Delete and recreate, an identity attribute changed
    Replace,
    /// Delete a resource
    Delete,
    /// Start tracking an existing resource
    Import,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::Import => write!(f, "import"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, diagnostics: &Diagnostics) {
        let error = diagnostics
            .errors()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Actions that change something
    pub fn changes(&self) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type != ActionType::NoOp)
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            replace: self.actions_by_type(ActionType::Replace).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}

/// Diff desired configurations against tracked objects of one type.
///
/// Only configurable attributes are compared. A change to a
/// `requires_replace` attribute makes the whole action a replacement.
pub fn plan_resources<'a>(
    resource_type: &str,
    schema: &Schema,
    desired: &BTreeMap<String, ObjectState>,
    tracked: impl IntoIterator<Item = (&'a str, &'a ObjectState)>,
) -> Plan {
    let tracked: BTreeMap<&str, &ObjectState> = tracked.into_iter().collect();
    let null = serde_json::json!({"state": "null"});
    let mut actions = Vec::new();

    for (name, config) in desired {
        let Some(current) = tracked.get(name.as_str()) else {
            actions.push(Action::new(
                ActionType::Create,
                resource_type,
                name,
                format!("create {}.{}", resource_type, name),
            ));
            continue;
        };

        let mut details = HashMap::new();
        let mut replace = false;
        for (attr_name, attribute) in &schema.attributes {
            if !attribute.is_configurable() {
                continue;
            }
            let want = config.attributes.get(*attr_name).unwrap_or(&null);
            let have = current.attributes.get(*attr_name).unwrap_or(&null);
            if want != have {
                replace |= attribute.requires_replace;
                details.insert(
                    attr_name.to_string(),
                    serde_json::json!({"from": have, "to": want}),
                );
            }
        }

        let (action_type, verb) = if details.is_empty() {
            (ActionType::NoOp, "keep")
        } else if replace {
            (ActionType::Replace, "replace")
        } else {
            (ActionType::Update, "update")
        };
        let mut action = Action::new(
            action_type,
            resource_type,
            name,
            format!("{} {}.{}", verb, resource_type, name),
        );
        action.details = details;
        actions.push(action);
    }

    for (name, _) in tracked.iter().filter(|(n, _)| !desired.contains_key(**n)) {
        actions.push(Action::new(
            ActionType::Delete,
            resource_type,
            name,
            format!("delete {}.{}", resource_type, name),
        ));
    }

    Plan::new(actions)
}

/// Plan upload mapping changes from named desired mappings
pub fn plan_mappings(
    desired: &BTreeMap<String, UploadMappingModel>,
    state: &StateFile,
) -> Result<Plan, Diagnostics> {
    let mut configs = BTreeMap::new();
    for (name, model) in desired {
        let config = ObjectState::from_record(UPLOAD_MAPPING, model)?;
        configs.insert(name.clone(), config);
    }

    Ok(plan_resources(
        UPLOAD_MAPPING,
        &UploadMappingModel::schema(),
        &configs,
        state.objects_of_type(UPLOAD_MAPPING),
    ))
}
