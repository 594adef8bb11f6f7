//! Rekognition Custom Labels dataset
//!
//! A dataset belongs to a project and is identified by its ARN. Both
//! configurable attributes force replacement; the only in-place change is
//! adding or replacing entries through [`DatasetResource::update_entries`].

use super::{LastStatusMessage, is_arn};
use crate::client::RekognitionApi;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stratus_cloud::{
    CloudError, ManagedResource, Observation, OperationAction, Result, Timeouts, WaitSpec,
    WaitSpecBuilder, WaitTuning,
};
use tokio_util::sync::CancellationToken;

pub const TYPE_NAME: &str = "aws_rekognition_dataset";
pub const DISPLAY_NAME: &str = "Rekognition Dataset";

const NOT_FOUND_CHECKS: u32 = 20;
const TARGET_OCCURRENCE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetType {
    Train,
    Test,
}

impl DatasetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::Train => "TRAIN",
            DatasetType::Test => "TEST",
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote dataset status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetStatus {
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    UpdateInProgress,
    UpdateComplete,
    UpdateFailed,
    DeleteInProgress,
    Unknown(String),
}

impl DatasetStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DatasetStatus::CreateInProgress => "CREATE_IN_PROGRESS",
            DatasetStatus::CreateComplete => "CREATE_COMPLETE",
            DatasetStatus::CreateFailed => "CREATE_FAILED",
            DatasetStatus::UpdateInProgress => "UPDATE_IN_PROGRESS",
            DatasetStatus::UpdateComplete => "UPDATE_COMPLETE",
            DatasetStatus::UpdateFailed => "UPDATE_FAILED",
            DatasetStatus::DeleteInProgress => "DELETE_IN_PROGRESS",
            DatasetStatus::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for DatasetStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "CREATE_IN_PROGRESS" => DatasetStatus::CreateInProgress,
            "CREATE_COMPLETE" => DatasetStatus::CreateComplete,
            "CREATE_FAILED" => DatasetStatus::CreateFailed,
            "UPDATE_IN_PROGRESS" => DatasetStatus::UpdateInProgress,
            "UPDATE_COMPLETE" => DatasetStatus::UpdateComplete,
            "UPDATE_FAILED" => DatasetStatus::UpdateFailed,
            "DELETE_IN_PROGRESS" => DatasetStatus::DeleteInProgress,
            other => DatasetStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User configuration of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub project_arn: String,
    pub dataset_type: DatasetType,
}

impl DatasetConfig {
    pub fn validate(&self) -> Result<()> {
        let len = self.project_arn.len();
        if !(1..=2048).contains(&len) {
            return Err(CloudError::InvalidConfig(format!(
                "project_arn must be between 1 and 2048 characters, got {}",
                len
            )));
        }
        if !is_arn(&self.project_arn) {
            return Err(CloudError::InvalidConfig(format!(
                "project_arn '{}' is not a valid ARN",
                self.project_arn
            )));
        }
        Ok(())
    }
}

/// What DescribeDataset reports
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescription {
    pub status: DatasetStatus,
    pub status_message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub total_entries: Option<i32>,
    pub error_entries: Option<i32>,
}

/// Recorded state of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetState {
    pub arn: String,
    pub project_arn: String,
    pub dataset_type: DatasetType,
    pub description: DatasetDescription,
}

impl DatasetState {
    fn new(arn: impl Into<String>, config: &DatasetConfig, description: DatasetDescription) -> Self {
        Self {
            arn: arn.into(),
            project_arn: config.project_arn.clone(),
            dataset_type: config.dataset_type,
            description,
        }
    }

    pub fn status(&self) -> &DatasetStatus {
        &self.description.status
    }
}

pub fn created_waiter(timeout: Duration) -> WaitSpecBuilder<DatasetStatus> {
    WaitSpec::builder(timeout)
        .pending([DatasetStatus::CreateInProgress])
        .target([DatasetStatus::CreateComplete])
        .not_found_checks(NOT_FOUND_CHECKS)
        .continuous_target_occurrence(TARGET_OCCURRENCE)
}

pub fn updated_waiter(timeout: Duration) -> WaitSpecBuilder<DatasetStatus> {
    WaitSpec::builder(timeout)
        .pending([DatasetStatus::UpdateInProgress])
        .target([DatasetStatus::UpdateComplete])
        .not_found_checks(NOT_FOUND_CHECKS)
        .continuous_target_occurrence(TARGET_OCCURRENCE)
}

/// Waits for the dataset to disappear
///
/// A dataset left in a failed state can still report it right after DeleteDataset.
pub fn deleted_waiter(timeout: Duration) -> WaitSpecBuilder<DatasetStatus> {
    WaitSpec::builder(timeout).pending([
        DatasetStatus::DeleteInProgress,
        DatasetStatus::CreateComplete,
        DatasetStatus::CreateFailed,
        DatasetStatus::UpdateComplete,
        DatasetStatus::UpdateFailed,
    ])
}

/// Rekognition dataset lifecycle
pub struct DatasetResource {
    client: Arc<dyn RekognitionApi>,
    tuning: WaitTuning,
    cancel: CancellationToken,
}

impl DatasetResource {
    pub fn new(client: Arc<dyn RekognitionApi>) -> Self {
        Self {
            client,
            tuning: WaitTuning::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_tuning(mut self, tuning: WaitTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Abort in-progress waits once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace or add dataset entries and wait for the update to finish
    ///
    /// `ground_truth` is a JSON Lines manifest; each line is one image entry.
    pub async fn update_entries(
        &self,
        prior: &DatasetState,
        ground_truth: &str,
        timeout: Duration,
    ) -> Result<DatasetState> {
        if ground_truth.trim().is_empty() {
            return Err(CloudError::InvalidConfig(
                "ground truth manifest is empty".to_string(),
            ));
        }

        tracing::info!("Updating entries of {} {}", DISPLAY_NAME, prior.arn);
        self.client
            .update_dataset_entries(&prior.arn, ground_truth.as_bytes())
            .await
            .map_err(|e| {
                CloudError::operation(OperationAction::Updating, DISPLAY_NAME, &prior.arn, e.into())
            })?;

        let description = self
            .wait(updated_waiter(timeout), OperationAction::WaitingForUpdate, &prior.arn)
            .await?
            .ok_or_else(|| CloudError::EmptyResult("DescribeDataset".to_string()))?;

        Ok(DatasetState {
            description,
            ..prior.clone()
        })
    }

    async fn find(&self, arn: &str) -> Result<Option<DatasetDescription>> {
        match self.client.describe_dataset(arn).await {
            Ok(description) => Ok(Some(description)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn observe(
        &self,
        arn: &str,
        last_message: &LastStatusMessage,
    ) -> Result<Observation<DatasetDescription, DatasetStatus>> {
        let found = self.find(arn).await?;
        if let Some(description) = &found {
            tracing::debug!("{} {} is {}", DISPLAY_NAME, arn, description.status);
            last_message.record(description.status_message.as_deref());
        }
        Ok(Observation::from_option(found, |d| d.status.clone()))
    }

    async fn wait(
        &self,
        builder: WaitSpecBuilder<DatasetStatus>,
        action: OperationAction,
        arn: &str,
    ) -> Result<Option<DatasetDescription>> {
        let spec = self.tuning.apply(builder).build()?;
        let last_message = &LastStatusMessage::default();

        let outcome = spec
            .wait_with_cancel(move || self.observe(arn, last_message), &self.cancel)
            .await
            .map_err(|e| last_message.failure(action, DISPLAY_NAME, arn, e))?;

        tracing::debug!(
            "{} {} settled after {} polls ({:?})",
            DISPLAY_NAME,
            arn,
            outcome.polls,
            outcome.elapsed
        );
        Ok(outcome.resource)
    }
}

#[async_trait]
impl ManagedResource for DatasetResource {
    type Config = DatasetConfig;
    type State = DatasetState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts::uniform(Duration::from_secs(30 * 60))
    }

    fn id<'a>(&self, state: &'a DatasetState) -> &'a str {
        &state.arn
    }

    fn requires_replace(&self, desired: &DatasetConfig, prior: &DatasetState) -> bool {
        desired.project_arn != prior.project_arn || desired.dataset_type != prior.dataset_type
    }

    fn has_changes(&self, desired: &DatasetConfig, prior: &DatasetState) -> bool {
        self.requires_replace(desired, prior)
    }

    async fn create(&self, desired: &DatasetConfig, timeouts: &Timeouts) -> Result<DatasetState> {
        desired.validate()?;

        tracing::info!(
            "Creating {} {} in {}",
            DISPLAY_NAME,
            desired.dataset_type,
            desired.project_arn
        );
        let arn = self
            .client
            .create_dataset(&desired.project_arn, desired.dataset_type)
            .await
            .map_err(|e| {
                CloudError::operation(
                    OperationAction::Creating,
                    DISPLAY_NAME,
                    &desired.project_arn,
                    e.into(),
                )
            })?
            .filter(|arn| !arn.is_empty())
            .ok_or_else(|| {
                CloudError::operation(
                    OperationAction::Creating,
                    DISPLAY_NAME,
                    &desired.project_arn,
                    CloudError::EmptyResult("CreateDataset".to_string()),
                )
            })?;

        let description = self
            .wait(created_waiter(timeouts.create), OperationAction::WaitingForCreation, &arn)
            .await?
            .ok_or_else(|| CloudError::EmptyResult("DescribeDataset".to_string()))?;

        tracing::info!("Created {} {}", DISPLAY_NAME, arn);
        Ok(DatasetState::new(arn, desired, description))
    }

    async fn read(&self, prior: &DatasetState) -> Result<Option<DatasetState>> {
        let found = self.find(&prior.arn).await.map_err(|e| {
            CloudError::operation(OperationAction::Reading, DISPLAY_NAME, &prior.arn, e)
        })?;

        match found {
            Some(description) => Ok(Some(DatasetState {
                description,
                ..prior.clone()
            })),
            None => {
                tracing::warn!("{} {} not found, removing from state", DISPLAY_NAME, prior.arn);
                Ok(None)
            }
        }
    }

    async fn update(
        &self,
        desired: &DatasetConfig,
        prior: &DatasetState,
        _timeouts: &Timeouts,
    ) -> Result<DatasetState> {
        if self.requires_replace(desired, prior) {
            return Err(CloudError::InvalidConfig(format!(
                "{} {} can't be changed in place",
                DISPLAY_NAME, prior.arn
            )));
        }

        self.read(prior).await?.ok_or_else(|| {
            CloudError::operation(
                OperationAction::Updating,
                DISPLAY_NAME,
                &prior.arn,
                CloudError::ResourceNotFound(prior.arn.clone()),
            )
        })
    }

    async fn delete(&self, prior: &DatasetState, timeouts: &Timeouts) -> Result<()> {
        tracing::info!("Deleting {} {}", DISPLAY_NAME, prior.arn);
        match self.client.delete_dataset(&prior.arn).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} {} already gone", DISPLAY_NAME, prior.arn);
                return Ok(());
            }
            Err(e) => {
                return Err(CloudError::operation(
                    OperationAction::Deleting,
                    DISPLAY_NAME,
                    &prior.arn,
                    e.into(),
                ));
            }
        }

        self.wait(deleted_waiter(timeouts.delete), OperationAction::WaitingForDeletion, &prior.arn)
            .await?;
        Ok(())
    }
}
