//! Action types for cloud resource management

use crate::error::{CloudError, Result};
use crate::provider::{ManagedResource, Timeouts};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Represents a planned action for a cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "aws_rekognition_dataset")
    pub resource_type: String,

    /// Resource identifier
    pub resource_id: String,

    /// Description of the action
    pub description: String,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self {
            id: format!("{}-{}", action_type, resource_id),
            description: format!("{} {} {}", action_type, resource_type, resource_id),
            action_type,
            resource_type,
            resource_id,
        }
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
    /// Delete and re-create a resource
    Replace,
    /// Delete a resource
    Delete,
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
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Decide what has to happen to move one resource from `prior` to `desired`
pub fn plan_change<R: ManagedResource>(
    resource: &R,
    desired: Option<&R::Config>,
    prior: Option<&R::State>,
) -> ActionType {
    match (desired, prior) {
        (Some(_), None) => ActionType::Create,
        (None, Some(_)) => ActionType::Delete,
        (None, None) => ActionType::NoOp,
        (Some(desired), Some(prior)) => {
            if resource.requires_replace(desired, prior) {
                ActionType::Replace
            } else if resource.has_changes(desired, prior) {
                ActionType::Update
            } else {
                ActionType::NoOp
            }
        }
    }
}

/// Drive one planned action through the resource lifecycle
///
/// Returns the state to record afterwards; `None` once the resource is gone.
pub async fn apply_change<R: ManagedResource>(
    resource: &R,
    action_type: ActionType,
    desired: Option<&R::Config>,
    prior: Option<R::State>,
    timeouts: &Timeouts,
) -> Result<Option<R::State>> {
    let missing = |what: &str| {
        CloudError::InvalidConfig(format!(
            "{} of {} requires {}",
            action_type,
            resource.type_name(),
            what
        ))
    };

    match action_type {
        ActionType::NoOp => Ok(prior),
        ActionType::Create => {
            let desired = desired.ok_or_else(|| missing("a configuration"))?;
            tracing::info!("Creating {}", resource.display_name());
            resource.create(desired, timeouts).await.map(Some)
        }
        ActionType::Update => {
            let desired = desired.ok_or_else(|| missing("a configuration"))?;
            let prior = prior.ok_or_else(|| missing("a prior state"))?;
            tracing::info!(
                "Updating {} {}",
                resource.display_name(),
                resource.id(&prior)
            );
            resource.update(desired, &prior, timeouts).await.map(Some)
        }
        ActionType::Replace => {
            let desired = desired.ok_or_else(|| missing("a configuration"))?;
            let prior = prior.ok_or_else(|| missing("a prior state"))?;
            tracing::info!(
                "Replacing {} {}",
                resource.display_name(),
                resource.id(&prior)
            );
            resource.delete(&prior, timeouts).await?;
            resource.create(desired, timeouts).await.map(Some)
        }
        ActionType::Delete => {
            let prior = prior.ok_or_else(|| missing("a prior state"))?;
            tracing::info!(
                "Deleting {} {}",
                resource.display_name(),
                resource.id(&prior)
            );
            resource.delete(&prior, timeouts).await?;
            Ok(None)
        }
    }
}

/// Plan and apply one resource, recording the outcome in `result`
///
/// On failure the prior state is kept, since the remote side may be unchanged.
pub async fn reconcile<R>(
    resource: &R,
    desired: Option<&R::Config>,
    prior: Option<R::State>,
    timeouts: &Timeouts,
    result: &mut ApplyResult,
) -> Option<R::State>
where
    R: ManagedResource,
    R::State: Clone,
{
    let start = Instant::now();
    let action_type = plan_change(resource, desired, prior.as_ref());
    let resource_id = prior
        .as_ref()
        .map(|p| resource.id(p).to_string())
        .unwrap_or_else(|| "(new)".to_string());
    let action = Action::new(action_type, resource.type_name(), resource_id);

    let fallback = prior.clone();
    let outcome = apply_change(resource, action_type, desired, prior, timeouts).await;
    result.duration_ms += start.elapsed().as_millis() as u64;

    match outcome {
        Ok(state) => {
            result.add_success(action.id, action.description);
            state
        }
        Err(e) => {
            tracing::warn!("{} failed: {}", action.description, e);
            result.add_failure(action.id, e.to_string());
            fallback
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
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
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
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

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
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
