use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stratus_cloud::{CloudError, ManagedResource, Timeouts, WaitError};
use stratus_cloud_aws::rekognition::stream_processor::{
    ConnectedHomeSettings, NotificationChannel, ParameterToDelete, S3Destination,
    StreamProcessorInput, StreamProcessorOutput, StreamProcessorSettings,
};
use stratus_cloud_aws::{
    AwsError, AwsProvider, AwsResult, DatasetConfig, DatasetDescription, DatasetState,
    DatasetStatus, DatasetType, RekognitionApi, StreamProcessorConfig,
    StreamProcessorDescription, StreamProcessorState, StreamProcessorStatus,
    StreamProcessorUpdate,
};
use stratus_config::{ProviderConfig, TimeoutSettings, WaiterSettings};
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

const PROJECT_ARN: &str = "arn:aws:rekognition:us-east-1:123456789012:project/shoes/1700000000000";
const DATASET_ARN: &str =
    "arn:aws:rekognition:us-east-1:123456789012:project/shoes/dataset/train/1700000000001";
const PROCESSOR_ARN: &str =
    "arn:aws:rekognition:us-east-1:123456789012:streamprocessor/front-door";

/// Scripted Rekognition API
///
/// Describe calls pop from a queue; the last successful entry repeats, and an
/// empty queue means the resource is gone.
#[derive(Default)]
struct MockRekognition {
    created_arn: Mutex<Option<String>>,
    datasets: Mutex<VecDeque<AwsResult<DatasetDescription>>>,
    processors: Mutex<VecDeque<AwsResult<StreamProcessorDescription>>>,
    delete_error: Mutex<Option<AwsError>>,
    tags: Mutex<BTreeMap<String, String>>,
    updates: Mutex<Vec<StreamProcessorUpdate>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockRekognition {
    fn with_created_arn(arn: Option<&str>) -> Self {
        let mock = Self::default();
        *mock.created_arn.lock().unwrap() = arn.map(str::to_owned);
        mock
    }

    fn script_datasets(&self, entries: Vec<AwsResult<DatasetDescription>>) {
        self.datasets.lock().unwrap().extend(entries);
    }

    fn script_processors(&self, entries: Vec<AwsResult<StreamProcessorDescription>>) {
        self.processors.lock().unwrap().extend(entries);
    }

    fn fail_delete(&self, err: AwsError) {
        *self.delete_error.lock().unwrap() = Some(err);
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    fn next<T: Clone>(
        queue: &Mutex<VecDeque<AwsResult<T>>>,
        operation: &'static str,
        id: &str,
    ) -> AwsResult<T> {
        let mut queue = queue.lock().unwrap();
        if queue.len() == 1 {
            if let Some(Ok(last)) = queue.front() {
                return Ok(last.clone());
            }
        }
        queue.pop_front().unwrap_or_else(|| {
            Err(AwsError::NotFound {
                operation,
                id: id.to_string(),
            })
        })
    }
}

#[async_trait]
impl RekognitionApi for MockRekognition {
    async fn create_dataset(&self, _: &str, _: DatasetType) -> AwsResult<Option<String>> {
        self.record("create_dataset");
        Ok(self.created_arn.lock().unwrap().clone())
    }

    async fn describe_dataset(&self, arn: &str) -> AwsResult<DatasetDescription> {
        self.record("describe_dataset");
        Self::next(&self.datasets, "DescribeDataset", arn)
    }

    async fn update_dataset_entries(&self, _: &str, ground_truth: &[u8]) -> AwsResult<()> {
        self.record("update_dataset_entries");
        assert!(!ground_truth.is_empty());
        Ok(())
    }

    async fn delete_dataset(&self, _: &str) -> AwsResult<()> {
        self.record("delete_dataset");
        match self.delete_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn create_stream_processor(&self, _: &StreamProcessorConfig) -> AwsResult<Option<String>> {
        self.record("create_stream_processor");
        Ok(self.created_arn.lock().unwrap().clone())
    }

    async fn describe_stream_processor(&self, name: &str) -> AwsResult<StreamProcessorDescription> {
        self.record("describe_stream_processor");
        Self::next(&self.processors, "DescribeStreamProcessor", name)
    }

    async fn update_stream_processor(
        &self,
        _: &str,
        update: &StreamProcessorUpdate,
    ) -> AwsResult<()> {
        self.record("update_stream_processor");
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn delete_stream_processor(&self, _: &str) -> AwsResult<()> {
        self.record("delete_stream_processor");
        match self.delete_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn list_tags(&self, _: &str) -> AwsResult<BTreeMap<String, String>> {
        self.record("list_tags");
        Ok(self.tags.lock().unwrap().clone())
    }

    async fn tag_resource(&self, _: &str, tags: &BTreeMap<String, String>) -> AwsResult<()> {
        self.record("tag_resource");
        self.tags
            .lock()
            .unwrap()
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn untag_resource(&self, _: &str, keys: &[String]) -> AwsResult<()> {
        self.record("untag_resource");
        let mut tags = self.tags.lock().unwrap();
        for key in keys {
            tags.remove(key);
        }
        Ok(())
    }
}

fn provider(mock: &Arc<MockRekognition>, config: ProviderConfig) -> AwsProvider {
    AwsProvider::with_client(mock.clone(), config)
}

fn dataset(status: DatasetStatus, message: Option<&str>) -> AwsResult<DatasetDescription> {
    Ok(DatasetDescription {
        status,
        status_message: message.map(str::to_owned),
        created_at: None,
        last_updated_at: None,
        total_entries: None,
        error_entries: None,
    })
}

fn gone<T>() -> AwsResult<T> {
    Err(AwsError::NotFound {
        operation: "Describe",
        id: "gone".into(),
    })
}

fn dataset_config() -> DatasetConfig {
    DatasetConfig {
        project_arn: PROJECT_ARN.into(),
        dataset_type: DatasetType::Train,
    }
}

fn dataset_state(status: DatasetStatus) -> DatasetState {
    DatasetState {
        arn: DATASET_ARN.into(),
        project_arn: PROJECT_ARN.into(),
        dataset_type: DatasetType::Train,
        description: dataset(status, None).unwrap(),
    }
}

fn processor_config() -> StreamProcessorConfig {
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
                key_prefix: None,
            }),
        },
        settings: StreamProcessorSettings {
            connected_home: Some(ConnectedHomeSettings {
                labels: vec!["PERSON".into()],
                min_confidence: Some(80.0),
            }),
            face_search: None,
        },
        notification_channel: Some(NotificationChannel {
            sns_topic_arn: "arn:aws:sns:us-east-1:123456789012:door-events".into(),
        }),
        data_sharing_preference: Default::default(),
        regions_of_interest: vec![],
        tags: BTreeMap::new(),
    }
}

fn processor(
    status: StreamProcessorStatus,
    message: Option<&str>,
    config: &StreamProcessorConfig,
) -> AwsResult<StreamProcessorDescription> {
    Ok(StreamProcessorDescription {
        arn: PROCESSOR_ARN.into(),
        status,
        status_message: message.map(str::to_owned),
        config: StreamProcessorConfig {
            tags: BTreeMap::new(),
            ..config.clone()
        },
    })
}

#[tokio::test(start_paused = true)]
async fn test_dataset_create_waits_for_sustained_complete() {
    let mock = Arc::new(MockRekognition::with_created_arn(Some(DATASET_ARN)));
    mock.script_datasets(vec![
        dataset(DatasetStatus::CreateInProgress, None),
        dataset(DatasetStatus::CreateInProgress, None),
        dataset(DatasetStatus::CreateComplete, None),
        dataset(DatasetStatus::CreateComplete, None),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    let state = resource
        .create(&dataset_config(), &Timeouts::default())
        .await
        .unwrap();

    assert_eq!(state.arn, DATASET_ARN);
    assert_eq!(state.status(), &DatasetStatus::CreateComplete);
    assert_eq!(mock.calls("describe_dataset"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_create_failure_carries_status_message() {
    let mock = Arc::new(MockRekognition::with_created_arn(Some(DATASET_ARN)));
    mock.script_datasets(vec![
        dataset(DatasetStatus::CreateInProgress, None),
        dataset(
            DatasetStatus::CreateFailed,
            Some("The manifest file contains invalid JSON"),
        ),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    let err = resource
        .create(&dataset_config(), &Timeouts::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err.wait_error(),
        Some(WaitError::UnexpectedState { status, .. }) if status == "CREATE_FAILED"
    ));
    let msg = err.to_string();
    assert!(msg.starts_with(&format!(
        "waiting for creation of Rekognition Dataset ({})",
        DATASET_ARN
    )));
    assert!(msg.ends_with("last error: The manifest file contains invalid JSON"));
    assert_eq!(mock.calls("describe_dataset"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_create_without_arn_is_empty_result() {
    let mock = Arc::new(MockRekognition::with_created_arn(None));
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    let err = resource
        .create(&dataset_config(), &Timeouts::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CloudError::Operation { ref source, .. } if matches!(**source, CloudError::EmptyResult(_))
    ));
    assert_eq!(mock.calls("describe_dataset"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_create_tolerates_eventual_consistency() {
    let mock = Arc::new(MockRekognition::with_created_arn(Some(DATASET_ARN)));
    mock.script_datasets(vec![
        gone(),
        gone(),
        dataset(DatasetStatus::CreateComplete, None),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    let state = resource
        .create(&dataset_config(), &Timeouts::default())
        .await
        .unwrap();

    assert_eq!(state.status(), &DatasetStatus::CreateComplete);
    assert_eq!(mock.calls("describe_dataset"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_create_times_out() {
    let mock = Arc::new(MockRekognition::with_created_arn(Some(DATASET_ARN)));
    mock.script_datasets(vec![dataset(DatasetStatus::CreateInProgress, None)]);
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    let timeouts = Timeouts::uniform(Duration::from_secs(5 * 60));
    let started = Instant::now();
    let err = resource
        .create(&dataset_config(), &timeouts)
        .await
        .unwrap_err();

    assert!(matches!(
        err.wait_error(),
        Some(WaitError::Timeout { last_status: Some(s), .. }) if s == "CREATE_IN_PROGRESS"
    ));
    assert_eq!(started.elapsed(), Duration::from_secs(5 * 60));
}

#[tokio::test(start_paused = true)]
async fn test_dataset_create_stops_when_cancelled() {
    let mock = Arc::new(MockRekognition::with_created_arn(Some(DATASET_ARN)));
    mock.script_datasets(vec![dataset(DatasetStatus::CreateInProgress, None)]);
    let cancel = CancellationToken::new();
    let resource = provider(&mock, ProviderConfig::default())
        .with_cancellation(cancel.clone())
        .dataset();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = assert_err!(resource.create(&dataset_config(), &Timeouts::default()).await);

    assert!(matches!(
        err.wait_error(),
        Some(WaitError::Cancelled { last_status: Some(s) }) if s == "CREATE_IN_PROGRESS"
    ));
    assert!(err.to_string().starts_with("waiting for creation of Rekognition Dataset"));
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_dataset_read_missing_is_none() {
    let mock = Arc::new(MockRekognition::default());
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    let state = resource
        .read(&dataset_state(DatasetStatus::CreateComplete))
        .await
        .unwrap();
    assert!(state.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dataset_delete_waits_until_gone() {
    let mock = Arc::new(MockRekognition::default());
    mock.script_datasets(vec![
        dataset(DatasetStatus::DeleteInProgress, None),
        dataset(DatasetStatus::DeleteInProgress, None),
        gone(),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    resource
        .delete(
            &dataset_state(DatasetStatus::CreateComplete),
            &Timeouts::default(),
        )
        .await
        .unwrap();

    assert_eq!(mock.calls("delete_dataset"), 1);
    assert_eq!(mock.calls("describe_dataset"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_delete_from_failed_update() {
    let mock = Arc::new(MockRekognition::default());
    mock.script_datasets(vec![
        dataset(DatasetStatus::UpdateFailed, Some("bad manifest")),
        dataset(DatasetStatus::DeleteInProgress, None),
        gone(),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    assert_ok!(
        resource
            .delete(
                &dataset_state(DatasetStatus::UpdateFailed),
                &Timeouts::default(),
            )
            .await
    );
    assert_eq!(mock.calls("describe_dataset"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_delete_of_missing_dataset_succeeds() {
    let mock = Arc::new(MockRekognition::default());
    mock.fail_delete(AwsError::NotFound {
        operation: "DeleteDataset",
        id: DATASET_ARN.into(),
    });
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    resource
        .delete(
            &dataset_state(DatasetStatus::CreateComplete),
            &Timeouts::default(),
        )
        .await
        .unwrap();

    assert_eq!(mock.calls("describe_dataset"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dataset_delete_api_failure_is_reported() {
    let mock = Arc::new(MockRekognition::default());
    mock.fail_delete(AwsError::Sdk {
        operation: "DeleteDataset",
        message: "ResourceInUseException".into(),
    });
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    let err = resource
        .delete(
            &dataset_state(DatasetStatus::CreateComplete),
            &Timeouts::default(),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("deleting Rekognition Dataset"));
    assert!(!err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_dataset_update_entries_waits_for_update_complete() {
    let mock = Arc::new(MockRekognition::default());
    mock.script_datasets(vec![
        dataset(DatasetStatus::UpdateInProgress, None),
        dataset(DatasetStatus::UpdateComplete, None),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).dataset();

    let manifest = r#"{"source-ref": "s3://shoes/1.jpg", "shoe": 1}"#;
    let state = resource
        .update_entries(
            &dataset_state(DatasetStatus::CreateComplete),
            manifest,
            Duration::from_secs(600),
        )
        .await
        .unwrap();

    assert_eq!(state.status(), &DatasetStatus::UpdateComplete);
    assert_eq!(mock.calls("update_dataset_entries"), 1);
    assert_eq!(mock.calls("describe_dataset"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_provider_applies_configured_tuning_and_timeouts() {
    let config = ProviderConfig {
        region: None,
        waiter: WaiterSettings {
            poll_interval: Some(Duration::from_secs(1)),
            ..Default::default()
        },
        timeouts: HashMap::from([(
            "aws_rekognition_dataset".to_string(),
            TimeoutSettings {
                create: Some(Duration::from_secs(90)),
                ..Default::default()
            },
        )]),
    };
    let mock = Arc::new(MockRekognition::with_created_arn(Some(DATASET_ARN)));
    mock.script_datasets(vec![
        dataset(DatasetStatus::CreateInProgress, None),
        dataset(DatasetStatus::CreateComplete, None),
    ]);
    let provider = provider(&mock, config);
    let resource = provider.dataset();

    let timeouts = provider.timeouts(&resource);
    assert_eq!(timeouts.create, Duration::from_secs(90));
    assert_eq!(timeouts.delete, Duration::from_secs(30 * 60));

    let started = Instant::now();
    resource.create(&dataset_config(), &timeouts).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_stream_processor_create_failed_is_unexpected_state() {
    let config = processor_config();
    let mock = Arc::new(MockRekognition::with_created_arn(Some(PROCESSOR_ARN)));
    mock.script_processors(vec![
        processor(StreamProcessorStatus::Stopped, None, &config),
        processor(
            StreamProcessorStatus::Failed,
            Some("Unable to access Kinesis video stream"),
            &config,
        ),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).stream_processor();

    let err = resource
        .create(&config, &Timeouts::default())
        .await
        .unwrap_err();

    match err.wait_error() {
        Some(WaitError::UnexpectedState {
            status, message, ..
        }) => {
            assert_eq!(status, "FAILED");
            assert_eq!(
                message.as_deref(),
                Some("Unable to access Kinesis video stream")
            );
        }
        other => panic!("expected unexpected state, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_stream_processor_create_records_tags() {
    let mut config = processor_config();
    config.tags.insert("team".into(), "video".into());

    let mock = Arc::new(MockRekognition::with_created_arn(Some(PROCESSOR_ARN)));
    mock.script_processors(vec![processor(StreamProcessorStatus::Stopped, None, &config)]);
    let resource = provider(&mock, ProviderConfig::default()).stream_processor();

    let state = assert_ok!(resource.create(&config, &Timeouts::default()).await);

    assert_eq!(state.arn, PROCESSOR_ARN);
    assert_eq!(state.status, StreamProcessorStatus::Stopped);
    assert_eq!(state.config, config);
    assert!(!resource.has_changes(&config, &state));
}

#[tokio::test(start_paused = true)]
async fn test_stream_processor_invalid_config_never_reaches_api() {
    let mut config = processor_config();
    config.name = "front door".into();

    let mock = Arc::new(MockRekognition::with_created_arn(Some(PROCESSOR_ARN)));
    let resource = provider(&mock, ProviderConfig::default()).stream_processor();

    let err = assert_err!(resource.create(&config, &Timeouts::default()).await);
    assert!(matches!(err, CloudError::InvalidConfig(_)));
    assert_eq!(mock.calls("create_stream_processor"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_processor_update_in_place() {
    let prior_config = processor_config();
    let prior = StreamProcessorState {
        arn: PROCESSOR_ARN.into(),
        status: StreamProcessorStatus::Stopped,
        status_message: None,
        config: prior_config.clone(),
    };

    let mut desired = prior_config.clone();
    if let Some(home) = desired.settings.connected_home.as_mut() {
        home.min_confidence = None;
        home.labels.push("PACKAGE".into());
    }
    desired.tags.insert("team".into(), "video".into());

    let mock = Arc::new(MockRekognition::default());
    mock.script_processors(vec![
        processor(StreamProcessorStatus::Updating, None, &prior_config),
        processor(StreamProcessorStatus::Stopped, None, &desired),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).stream_processor();
    assert!(!resource.requires_replace(&desired, &prior));

    let state = resource
        .update(&desired, &prior, &Timeouts::default())
        .await
        .unwrap();

    let updates = mock.updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].parameters_to_delete,
        vec![ParameterToDelete::ConnectedHomeMinConfidence]
    );
    assert_eq!(mock.calls("tag_resource"), 1);
    assert_eq!(mock.calls("untag_resource"), 0);
    assert_eq!(state.config, desired);
}

#[tokio::test(start_paused = true)]
async fn test_stream_processor_rename_requires_replace() {
    let prior = StreamProcessorState {
        arn: PROCESSOR_ARN.into(),
        status: StreamProcessorStatus::Running,
        status_message: None,
        config: processor_config(),
    };
    let mut desired = processor_config();
    desired.name = "back-door".into();

    let mock = Arc::new(MockRekognition::default());
    let resource = provider(&mock, ProviderConfig::default()).stream_processor();

    assert!(resource.requires_replace(&desired, &prior));
    let err = resource
        .update(&desired, &prior, &Timeouts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::InvalidConfig(_)));
    assert_eq!(mock.calls("update_stream_processor"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stream_processor_delete_waits_through_stopping() {
    let config = processor_config();
    let mock = Arc::new(MockRekognition::default());
    mock.script_processors(vec![
        processor(StreamProcessorStatus::Stopping, None, &config),
        processor(StreamProcessorStatus::Stopped, None, &config),
        gone(),
    ]);
    let resource = provider(&mock, ProviderConfig::default()).stream_processor();
    let prior = StreamProcessorState {
        arn: PROCESSOR_ARN.into(),
        status: StreamProcessorStatus::Running,
        status_message: None,
        config,
    };

    resource.delete(&prior, &Timeouts::default()).await.unwrap();

    assert_eq!(mock.calls("delete_stream_processor"), 1);
    assert_eq!(mock.calls("describe_stream_processor"), 3);
}
