//! Rekognition Video stream processor
//!
//! Identified by name. Connected-home settings, regions of interest and the
//! data sharing preference can change in place; everything else forces a
//! replacement.

use super::{LastStatusMessage, is_arn};
use crate::client::RekognitionApi;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use stratus_cloud::{
    CloudError, ManagedResource, Observation, OperationAction, Result, Timeouts, WaitSpec,
    WaitSpecBuilder, WaitTuning,
};
use tokio_util::sync::CancellationToken;

pub const TYPE_NAME: &str = "aws_rekognition_stream_processor";
pub const DISPLAY_NAME: &str = "Rekognition Stream Processor";

const NOT_FOUND_CHECKS: u32 = 20;
const TARGET_OCCURRENCE: u32 = 2;

const NAME_MAX_LEN: usize = 128;
const KMS_KEY_ID_MAX_LEN: usize = 2048;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.\-]+$").expect("name pattern is valid"));

static KMS_KEY_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9:_/+=,@.-]{0,2048}$").expect("kms key pattern is valid")
});

/// Remote stream processor status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamProcessorStatus {
    Stopped,
    Starting,
    Running,
    Failed,
    Stopping,
    Updating,
    Unknown(String),
}

impl StreamProcessorStatus {
    pub const ALL: [StreamProcessorStatus; 6] = [
        StreamProcessorStatus::Stopped,
        StreamProcessorStatus::Starting,
        StreamProcessorStatus::Running,
        StreamProcessorStatus::Failed,
        StreamProcessorStatus::Stopping,
        StreamProcessorStatus::Updating,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            StreamProcessorStatus::Stopped => "STOPPED",
            StreamProcessorStatus::Starting => "STARTING",
            StreamProcessorStatus::Running => "RUNNING",
            StreamProcessorStatus::Failed => "FAILED",
            StreamProcessorStatus::Stopping => "STOPPING",
            StreamProcessorStatus::Updating => "UPDATING",
            StreamProcessorStatus::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for StreamProcessorStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "STOPPED" => StreamProcessorStatus::Stopped,
            "STARTING" => StreamProcessorStatus::Starting,
            "RUNNING" => StreamProcessorStatus::Running,
            "FAILED" => StreamProcessorStatus::Failed,
            "STOPPING" => StreamProcessorStatus::Stopping,
            "UPDATING" => StreamProcessorStatus::Updating,
            other => StreamProcessorStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for StreamProcessorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User configuration of a stream processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamProcessorConfig {
    pub name: String,

    /// IAM role Rekognition assumes to read the input and write the output
    pub role_arn: String,

    #[serde(default)]
    pub kms_key_id: Option<String>,

    pub input: StreamProcessorInput,

    pub output: StreamProcessorOutput,

    pub settings: StreamProcessorSettings,

    #[serde(default)]
    pub notification_channel: Option<NotificationChannel>,

    #[serde(default)]
    pub data_sharing_preference: DataSharingPreference,

    #[serde(default)]
    pub regions_of_interest: Vec<RegionOfInterest>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProcessorInput {
    pub kinesis_video_stream_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProcessorOutput {
    #[serde(default)]
    pub kinesis_data_stream_arn: Option<String>,

    #[serde(default)]
    pub s3_destination: Option<S3Destination>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Destination {
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub key_prefix: Option<String>,
}

/// Analysis settings; exactly one of the two is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamProcessorSettings {
    #[serde(default)]
    pub connected_home: Option<ConnectedHomeSettings>,

    #[serde(default)]
    pub face_search: Option<FaceSearchSettings>,
}

/// Label detection (PERSON, PET, PACKAGE, ALL)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectedHomeSettings {
    pub labels: Vec<String>,

    #[serde(default)]
    pub min_confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceSearchSettings {
    #[serde(default)]
    pub collection_id: Option<String>,

    #[serde(default)]
    pub face_match_threshold: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub sns_topic_arn: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSharingPreference {
    #[serde(default)]
    pub opt_in: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,

    #[serde(default)]
    pub polygon: Vec<Point>,
}

/// Box in ratios of the frame size
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub height: f32,
    pub left: f32,
    pub top: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl StreamProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CloudError::InvalidConfig(msg));

        if self.name.is_empty() || self.name.len() > NAME_MAX_LEN {
            return invalid(format!(
                "name must be between 1 and {} characters, got {}",
                NAME_MAX_LEN,
                self.name.len()
            ));
        }
        if !NAME_PATTERN.is_match(&self.name) {
            return invalid(format!(
                "name '{}' must conform to: [a-zA-Z0-9_.\\-]+",
                self.name
            ));
        }

        if let Some(key) = &self.kms_key_id {
            if key.len() > KMS_KEY_ID_MAX_LEN || !KMS_KEY_ID_PATTERN.is_match(key) {
                return invalid(
                    "kms_key_id must conform to: ^[A-Za-z0-9][A-Za-z0-9:_/+=,@.-]{0,2048}$"
                        .to_string(),
                );
            }
        }

        if !is_arn(&self.role_arn) {
            return invalid(format!("role_arn '{}' is not a valid ARN", self.role_arn));
        }
        if !is_arn(&self.input.kinesis_video_stream_arn) {
            return invalid(format!(
                "input kinesis_video_stream_arn '{}' is not a valid ARN",
                self.input.kinesis_video_stream_arn
            ));
        }

        match (&self.output.kinesis_data_stream_arn, &self.output.s3_destination) {
            (None, None) => {
                return invalid(
                    "output needs a kinesis_data_stream_arn or an s3_destination".to_string(),
                );
            }
            (Some(arn), _) if !is_arn(arn) => {
                return invalid(format!("output kinesis_data_stream_arn '{}' is not a valid ARN", arn));
            }
            _ => {}
        }

        match (&self.settings.connected_home, &self.settings.face_search) {
            (Some(_), Some(_)) | (None, None) => {
                return invalid(
                    "settings need exactly one of connected_home or face_search".to_string(),
                );
            }
            (Some(home), None) if home.labels.is_empty() => {
                return invalid("connected_home needs at least one label".to_string());
            }
            _ => {}
        }

        if let Some(channel) = &self.notification_channel {
            if !is_arn(&channel.sns_topic_arn) {
                return invalid(format!(
                    "notification sns_topic_arn '{}' is not a valid ARN",
                    channel.sns_topic_arn
                ));
            }
        }

        if let Some(i) = self
            .regions_of_interest
            .iter()
            .position(|r| r.bounding_box.is_none() && r.polygon.is_empty())
        {
            return invalid(format!(
                "regions_of_interest[{}] needs a bounding_box or a polygon",
                i
            ));
        }

        Ok(())
    }
}

/// Parameters that an update clears instead of setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterToDelete {
    ConnectedHomeMinConfidence,
    RegionsOfInterest,
}

/// In-place changes sent with UpdateStreamProcessor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamProcessorUpdate {
    pub connected_home: Option<ConnectedHomeSettings>,
    pub regions_of_interest: Option<Vec<RegionOfInterest>>,
    pub data_sharing_preference: Option<DataSharingPreference>,
    pub parameters_to_delete: Vec<ParameterToDelete>,
}

impl StreamProcessorUpdate {
    /// Changes needed to move `prior` to `desired`; `None` if nothing updatable differs
    pub fn between(desired: &StreamProcessorConfig, prior: &StreamProcessorConfig) -> Option<Self> {
        let mut update = Self::default();

        if desired.settings.connected_home != prior.settings.connected_home {
            if let Some(home) = &desired.settings.connected_home {
                let prior_min = prior
                    .settings
                    .connected_home
                    .as_ref()
                    .and_then(|h| h.min_confidence);
                if home.min_confidence.is_none() && prior_min.is_some() {
                    update
                        .parameters_to_delete
                        .push(ParameterToDelete::ConnectedHomeMinConfidence);
                }
                update.connected_home = Some(home.clone());
            }
        }

        if desired.regions_of_interest != prior.regions_of_interest {
            if desired.regions_of_interest.is_empty() {
                update
                    .parameters_to_delete
                    .push(ParameterToDelete::RegionsOfInterest);
            } else {
                update.regions_of_interest = Some(desired.regions_of_interest.clone());
            }
        }

        if desired.data_sharing_preference != prior.data_sharing_preference {
            update.data_sharing_preference = Some(desired.data_sharing_preference);
        }

        (!update.is_empty()).then_some(update)
    }

    pub fn is_empty(&self) -> bool {
        self.connected_home.is_none()
            && self.regions_of_interest.is_none()
            && self.data_sharing_preference.is_none()
            && self.parameters_to_delete.is_empty()
    }
}

/// Tags to set and tag keys to remove
pub fn tag_changes(
    desired: &BTreeMap<String, String>,
    prior: &BTreeMap<String, String>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let set = desired
        .iter()
        .filter(|(k, v)| prior.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let remove = prior
        .keys()
        .filter(|k| !desired.contains_key(*k))
        .cloned()
        .collect();
    (set, remove)
}

/// What DescribeStreamProcessor reports; `config.tags` is always empty
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProcessorDescription {
    pub arn: String,
    pub status: StreamProcessorStatus,
    pub status_message: Option<String>,
    pub config: StreamProcessorConfig,
}

/// Recorded state of a stream processor
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProcessorState {
    pub arn: String,
    pub status: StreamProcessorStatus,
    pub status_message: Option<String>,
    pub config: StreamProcessorConfig,
}

impl StreamProcessorState {
    fn new(arn: String, description: StreamProcessorDescription, tags: BTreeMap<String, String>) -> Self {
        Self {
            arn,
            status: description.status,
            status_message: description.status_message,
            config: StreamProcessorConfig {
                tags,
                ..description.config
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}

const SETTLED: [StreamProcessorStatus; 3] = [
    StreamProcessorStatus::Stopped,
    StreamProcessorStatus::Starting,
    StreamProcessorStatus::Running,
];

/// Any settled status is fine; FAILED and the transitional statuses are not
pub fn created_waiter(timeout: Duration) -> WaitSpecBuilder<StreamProcessorStatus> {
    WaitSpec::builder(timeout)
        .target(SETTLED)
        .not_found_checks(NOT_FOUND_CHECKS)
        .continuous_target_occurrence(TARGET_OCCURRENCE)
}

pub fn updated_waiter(timeout: Duration) -> WaitSpecBuilder<StreamProcessorStatus> {
    WaitSpec::builder(timeout)
        .pending([StreamProcessorStatus::Updating])
        .target(SETTLED)
        .not_found_checks(NOT_FOUND_CHECKS)
        .continuous_target_occurrence(TARGET_OCCURRENCE)
}

pub fn deleted_waiter(timeout: Duration) -> WaitSpecBuilder<StreamProcessorStatus> {
    WaitSpec::builder(timeout).pending(StreamProcessorStatus::ALL)
}

/// Rekognition stream processor lifecycle
pub struct StreamProcessorResource {
    client: Arc<dyn RekognitionApi>,
    tuning: WaitTuning,
    cancel: CancellationToken,
}

impl StreamProcessorResource {
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

    async fn find(&self, name: &str) -> Result<Option<StreamProcessorDescription>> {
        match self.client.describe_stream_processor(name).await {
            Ok(description) => Ok(Some(description)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn observe(
        &self,
        name: &str,
        last_message: &LastStatusMessage,
    ) -> Result<Observation<StreamProcessorDescription, StreamProcessorStatus>> {
        let found = self.find(name).await?;
        if let Some(description) = &found {
            tracing::debug!("{} {} is {}", DISPLAY_NAME, name, description.status);
            last_message.record(description.status_message.as_deref());
        }
        Ok(Observation::from_option(found, |d| d.status.clone()))
    }

    async fn wait(
        &self,
        builder: WaitSpecBuilder<StreamProcessorStatus>,
        action: OperationAction,
        name: &str,
    ) -> Result<Option<StreamProcessorDescription>> {
        let spec = self.tuning.apply(builder).build()?;
        let last_message = &LastStatusMessage::default();

        let outcome = spec
            .wait_with_cancel(move || self.observe(name, last_message), &self.cancel)
            .await
            .map_err(|e| last_message.failure(action, DISPLAY_NAME, name, e))?;

        tracing::debug!(
            "{} {} settled after {} polls ({:?})",
            DISPLAY_NAME,
            name,
            outcome.polls,
            outcome.elapsed
        );
        Ok(outcome.resource)
    }

    async fn sync_tags(
        &self,
        arn: &str,
        desired: &BTreeMap<String, String>,
        prior: &BTreeMap<String, String>,
    ) -> Result<()> {
        let (set, remove) = tag_changes(desired, prior);
        let failed = |e: crate::AwsError| {
            CloudError::operation(OperationAction::Updating, DISPLAY_NAME, arn, e.into())
        };

        if !remove.is_empty() {
            tracing::debug!("Removing {} tags from {}", remove.len(), arn);
            self.client.untag_resource(arn, &remove).await.map_err(failed)?;
        }
        if !set.is_empty() {
            tracing::debug!("Setting {} tags on {}", set.len(), arn);
            self.client.tag_resource(arn, &set).await.map_err(failed)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ManagedResource for StreamProcessorResource {
    type Config = StreamProcessorConfig;
    type State = StreamProcessorState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn display_name(&self) -> &'static str {
        DISPLAY_NAME
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts::uniform(Duration::from_secs(30 * 60))
    }

    fn id<'a>(&self, state: &'a StreamProcessorState) -> &'a str {
        state.name()
    }

    fn requires_replace(&self, desired: &StreamProcessorConfig, prior: &StreamProcessorState) -> bool {
        let prior = &prior.config;
        desired.name != prior.name
            || desired.role_arn != prior.role_arn
            || desired.kms_key_id != prior.kms_key_id
            || desired.input != prior.input
            || desired.output != prior.output
            || desired.notification_channel != prior.notification_channel
            || desired.settings.face_search != prior.settings.face_search
    }

    fn has_changes(&self, desired: &StreamProcessorConfig, prior: &StreamProcessorState) -> bool {
        *desired != prior.config
    }

    async fn create(
        &self,
        desired: &StreamProcessorConfig,
        timeouts: &Timeouts,
    ) -> Result<StreamProcessorState> {
        desired.validate()?;
        let name = desired.name.as_str();

        tracing::info!("Creating {} {}", DISPLAY_NAME, name);
        let arn = self
            .client
            .create_stream_processor(desired)
            .await
            .map_err(|e| CloudError::operation(OperationAction::Creating, DISPLAY_NAME, name, e.into()))?
            .filter(|arn| !arn.is_empty())
            .ok_or_else(|| {
                CloudError::operation(
                    OperationAction::Creating,
                    DISPLAY_NAME,
                    name,
                    CloudError::EmptyResult("CreateStreamProcessor".to_string()),
                )
            })?;

        let description = self
            .wait(created_waiter(timeouts.create), OperationAction::WaitingForCreation, name)
            .await?
            .ok_or_else(|| CloudError::EmptyResult("DescribeStreamProcessor".to_string()))?;

        tracing::info!("Created {} {} ({})", DISPLAY_NAME, name, description.status);
        Ok(StreamProcessorState::new(arn, description, desired.tags.clone()))
    }

    async fn read(&self, prior: &StreamProcessorState) -> Result<Option<StreamProcessorState>> {
        let name = prior.name();
        let reading = |e: CloudError| CloudError::operation(OperationAction::Reading, DISPLAY_NAME, name, e);

        let Some(description) = self.find(name).await.map_err(reading)? else {
            tracing::warn!("{} {} not found, removing from state", DISPLAY_NAME, name);
            return Ok(None);
        };

        let arn = if description.arn.is_empty() {
            prior.arn.clone()
        } else {
            description.arn.clone()
        };
        let tags = self
            .client
            .list_tags(&arn)
            .await
            .map_err(|e| reading(e.into()))?;

        Ok(Some(StreamProcessorState::new(arn, description, tags)))
    }

    async fn update(
        &self,
        desired: &StreamProcessorConfig,
        prior: &StreamProcessorState,
        timeouts: &Timeouts,
    ) -> Result<StreamProcessorState> {
        desired.validate()?;
        let name = prior.name();

        if self.requires_replace(desired, prior) {
            return Err(CloudError::InvalidConfig(format!(
                "{} {} needs replacement, not an update",
                DISPLAY_NAME, name
            )));
        }

        if let Some(update) = StreamProcessorUpdate::between(desired, &prior.config) {
            tracing::info!("Updating {} {}", DISPLAY_NAME, name);
            self.client
                .update_stream_processor(name, &update)
                .await
                .map_err(|e| CloudError::operation(OperationAction::Updating, DISPLAY_NAME, name, e.into()))?;

            self.wait(updated_waiter(timeouts.update), OperationAction::WaitingForUpdate, name)
                .await?;
        }

        self.sync_tags(&prior.arn, &desired.tags, &prior.config.tags)
            .await?;

        self.read(prior).await?.ok_or_else(|| {
            CloudError::operation(
                OperationAction::Updating,
                DISPLAY_NAME,
                name,
                CloudError::ResourceNotFound(name.to_string()),
            )
        })
    }

    async fn delete(&self, prior: &StreamProcessorState, timeouts: &Timeouts) -> Result<()> {
        let name = prior.name();

        tracing::info!("Deleting {} {}", DISPLAY_NAME, name);
        match self.client.delete_stream_processor(name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} {} already gone", DISPLAY_NAME, name);
                return Ok(());
            }
            Err(e) => {
                return Err(CloudError::operation(
                    OperationAction::Deleting,
                    DISPLAY_NAME,
                    name,
                    e.into(),
                ));
            }
        }

        self.wait(deleted_waiter(timeouts.delete), OperationAction::WaitingForDeletion, name)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StreamProcessorConfig {
        StreamProcessorConfig {
            name: "front-door".into(),
            role_arn: "arn:aws:iam::123456789012:role/rekognition-stream".into(),
            kms_key_id: None,
            input: StreamProcessorInput {
                kinesis_video_stream_arn:
                    "arn:aws:kinesisvideo:us-east-1:123456789012:stream/front-door/1700000000000"
                        .into(),
            },
            output: StreamProcessorOutput {
                kinesis_data_stream_arn: None,
                s3_destination: Some(S3Destination {
                    bucket: Some("door-events".into()),
                    key_prefix: Some("front/".into()),
                }),
            },
            settings: StreamProcessorSettings {
                connected_home: Some(ConnectedHomeSettings {
                    labels: vec!["PERSON".into(), "PACKAGE".into()],
                    min_confidence: Some(80.0),
                }),
                face_search: None,
            },
            notification_channel: Some(NotificationChannel {
                sns_topic_arn: "arn:aws:sns:us-east-1:123456789012:door-events".into(),
            }),
            data_sharing_preference: DataSharingPreference::default(),
            regions_of_interest: vec![],
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_name() {
        let mut c = config();
        c.name = "front door".into();
        assert!(matches!(c.validate(), Err(CloudError::InvalidConfig(_))));

        c.name = "a".repeat(129);
        assert!(matches!(c.validate(), Err(CloudError::InvalidConfig(_))));

        c.name = "front_door.v2-a".into();
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_kms_key_id() {
        let mut c = config();
        c.kms_key_id = Some("alias/rekognition".into());
        assert!(c.validate().is_ok());

        c.kms_key_id = Some("/leading-slash".into());
        assert!(matches!(c.validate(), Err(CloudError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_settings_exactly_one() {
        let mut c = config();
        c.settings.face_search = Some(FaceSearchSettings {
            collection_id: Some("staff".into()),
            face_match_threshold: Some(90.0),
        });
        assert!(matches!(c.validate(), Err(CloudError::InvalidConfig(_))));

        c.settings = StreamProcessorSettings::default();
        assert!(matches!(c.validate(), Err(CloudError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_output_required() {
        let mut c = config();
        c.output = StreamProcessorOutput::default();
        assert!(matches!(c.validate(), Err(CloudError::InvalidConfig(_))));
    }

    #[test]
    fn test_update_clears_min_confidence_and_regions() {
        let mut prior = config();
        prior.regions_of_interest = vec![RegionOfInterest {
            bounding_box: Some(BoundingBox {
                height: 0.5,
                left: 0.1,
                top: 0.1,
                width: 0.5,
            }),
            polygon: vec![],
        }];

        let mut desired = config();
        if let Some(home) = desired.settings.connected_home.as_mut() {
            home.min_confidence = None;
        }

        let update = StreamProcessorUpdate::between(&desired, &prior).unwrap();
        assert_eq!(
            update.parameters_to_delete,
            vec![
                ParameterToDelete::ConnectedHomeMinConfidence,
                ParameterToDelete::RegionsOfInterest
            ]
        );
        assert!(update.regions_of_interest.is_none());
        assert!(update.connected_home.is_some());
        assert!(update.data_sharing_preference.is_none());
    }

    #[test]
    fn test_update_none_when_only_tags_differ() {
        let prior = config();
        let mut desired = config();
        desired.tags.insert("team".into(), "video".into());

        assert!(StreamProcessorUpdate::between(&desired, &prior).is_none());
    }

    #[test]
    fn test_tag_changes() {
        let prior = BTreeMap::from([
            ("team".to_string(), "video".to_string()),
            ("env".to_string(), "dev".to_string()),
        ]);
        let desired = BTreeMap::from([
            ("team".to_string(), "video".to_string()),
            ("env".to_string(), "prod".to_string()),
            ("owner".to_string(), "ops".to_string()),
        ]);

        let (set, remove) = tag_changes(&desired, &prior);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("env").map(String::as_str), Some("prod"));
        assert!(remove.is_empty());

        let (set, remove) = tag_changes(&BTreeMap::new(), &prior);
        assert!(set.is_empty());
        assert_eq!(remove, vec!["env".to_string(), "team".to_string()]);
    }

    #[test]
    fn test_waiters() {
        let timeout = Duration::from_secs(60);

        let created = created_waiter(timeout).build().unwrap();
        assert!(created.pending().is_empty());
        assert!(!created.target().contains(&StreamProcessorStatus::Failed));
        assert_eq!(created.continuous_target_occurrence(), 2);

        let deleted = deleted_waiter(timeout).build().unwrap();
        assert_eq!(deleted.pending().len(), 6);
        assert!(deleted.target().is_empty());
    }

    #[test]
    fn test_config_from_yaml_like_json() {
        let c: StreamProcessorConfig = serde_json::from_value(serde_json::json!({
            "name": "lobby",
            "role_arn": "arn:aws:iam::123456789012:role/r",
            "input": {"kinesis_video_stream_arn": "arn:aws:kinesisvideo:us-east-1:123456789012:stream/lobby/1"},
            "output": {"kinesis_data_stream_arn": "arn:aws:kinesis:us-east-1:123456789012:stream/faces"},
            "settings": {"face_search": {"collection_id": "staff", "face_match_threshold": 85.0}}
        }))
        .unwrap();

        assert!(!c.data_sharing_preference.opt_in);
        assert!(c.regions_of_interest.is_empty());
        assert!(c.validate().is_ok());
    }
}
