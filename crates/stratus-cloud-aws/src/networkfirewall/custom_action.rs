//! Custom actions: publish CloudWatch metrics when a rule matches

use crate::error::{AwsError, AwsResult};
use aws_sdk_networkfirewall::types as sdk;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use stratus_cloud::CloudError;

static ACTION_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]+$").expect("action name pattern is valid"));

/// A named custom action; changing the name forces replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAction {
    pub action_name: String,
    pub action_definition: ActionDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    #[serde(default)]
    pub publish_metric_action: Option<PublishMetricAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishMetricAction {
    pub dimensions: BTreeSet<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dimension {
    pub value: String,
}

impl CustomAction {
    pub fn validate(&self) -> stratus_cloud::Result<()> {
        if !ACTION_NAME_PATTERN.is_match(&self.action_name) {
            return Err(CloudError::InvalidConfig(format!(
                "custom action name '{}' must contain only alphanumeric characters",
                self.action_name
            )));
        }
        Ok(())
    }

    pub fn requires_replace(&self, prior: &CustomAction) -> bool {
        self.action_name != prior.action_name
    }

    pub fn to_sdk(&self) -> AwsResult<sdk::CustomAction> {
        self.validate()?;

        let publish_metric_action = self
            .action_definition
            .publish_metric_action
            .as_ref()
            .map(|action| {
                let dimensions = action
                    .dimensions
                    .iter()
                    .map(|d| {
                        sdk::Dimension::builder()
                            .value(&d.value)
                            .build()
                            .map_err(AwsError::build)
                    })
                    .collect::<AwsResult<Vec<_>>>()?;
                sdk::PublishMetricAction::builder()
                    .set_dimensions(Some(dimensions))
                    .build()
                    .map_err(AwsError::build)
            })
            .transpose()?;

        sdk::CustomAction::builder()
            .action_name(&self.action_name)
            .action_definition(
                sdk::ActionDefinition::builder()
                    .set_publish_metric_action(publish_metric_action)
                    .build(),
            )
            .build()
            .map_err(AwsError::build)
    }

    pub fn from_sdk(action: &sdk::CustomAction) -> Self {
        let publish_metric_action = action
            .action_definition()
            .and_then(|d| d.publish_metric_action())
            .map(|p| PublishMetricAction {
                dimensions: p
                    .dimensions()
                    .iter()
                    .map(|d| Dimension {
                        value: d.value().to_string(),
                    })
                    .collect(),
            });

        Self {
            action_name: action.action_name().to_string(),
            action_definition: ActionDefinition {
                publish_metric_action,
            },
        }
    }
}

/// Request form of a custom action list; `None` when there are none
pub fn expand_custom_actions(actions: &[CustomAction]) -> AwsResult<Option<Vec<sdk::CustomAction>>> {
    if actions.is_empty() {
        return Ok(None);
    }
    actions
        .iter()
        .map(CustomAction::to_sdk)
        .collect::<AwsResult<Vec<_>>>()
        .map(Some)
}

pub fn flatten_custom_actions(actions: &[sdk::CustomAction]) -> Vec<CustomAction> {
    actions.iter().map(CustomAction::from_sdk).collect()
}
