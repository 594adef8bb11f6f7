//! Rekognition API client
//!
//! Resources talk to AWS only through [`RekognitionApi`], which returns
//! domain values and classifies `ResourceNotFoundException` as
//! [`AwsError::NotFound`]. [`SdkRekognition`] is the aws-sdk-rekognition
//! implementation.

use crate::error::{AwsError, AwsResult};
use crate::rekognition::dataset::{DatasetDescription, DatasetType};
use crate::rekognition::sdk;
use crate::rekognition::stream_processor::{
    StreamProcessorConfig, StreamProcessorDescription, StreamProcessorUpdate,
};
use async_trait::async_trait;
use aws_sdk_rekognition::Client;
use aws_sdk_rekognition::error::{DisplayErrorContext, SdkError};
use aws_sdk_rekognition::operation::{
    create_dataset::CreateDatasetError, create_stream_processor::CreateStreamProcessorError,
    delete_dataset::DeleteDatasetError, delete_stream_processor::DeleteStreamProcessorError,
    describe_dataset::DescribeDatasetError,
    describe_stream_processor::DescribeStreamProcessorError,
    list_tags_for_resource::ListTagsForResourceError, tag_resource::TagResourceError,
    untag_resource::UntagResourceError, update_dataset_entries::UpdateDatasetEntriesError,
    update_stream_processor::UpdateStreamProcessorError,
};
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::DatasetChanges;
use stratus_cloud::CloudError;
use std::collections::BTreeMap;

#[async_trait]
pub trait RekognitionApi: Send + Sync {
    /// Returns the new dataset ARN, if the API reported one
    async fn create_dataset(
        &self,
        project_arn: &str,
        dataset_type: DatasetType,
    ) -> AwsResult<Option<String>>;

    async fn describe_dataset(&self, arn: &str) -> AwsResult<DatasetDescription>;

    /// Add or replace entries from a JSON Lines ground truth manifest
    async fn update_dataset_entries(&self, arn: &str, ground_truth: &[u8]) -> AwsResult<()>;

    async fn delete_dataset(&self, arn: &str) -> AwsResult<()>;

    /// Returns the new stream processor ARN, if the API reported one
    async fn create_stream_processor(
        &self,
        config: &StreamProcessorConfig,
    ) -> AwsResult<Option<String>>;

    async fn describe_stream_processor(&self, name: &str) -> AwsResult<StreamProcessorDescription>;

    async fn update_stream_processor(
        &self,
        name: &str,
        update: &StreamProcessorUpdate,
    ) -> AwsResult<()>;

    async fn delete_stream_processor(&self, name: &str) -> AwsResult<()>;

    async fn list_tags(&self, arn: &str) -> AwsResult<BTreeMap<String, String>>;

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> AwsResult<()>;

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> AwsResult<()>;
}

/// Classify an SDK failure; `is_not_found` picks out ResourceNotFoundException
fn sdk_error<E, R>(
    operation: &'static str,
    id: &str,
    err: SdkError<E, R>,
    is_not_found: fn(&E) -> bool,
) -> AwsError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if err.as_service_error().is_some_and(is_not_found) {
        return AwsError::NotFound {
            operation,
            id: id.to_string(),
        };
    }
    AwsError::Sdk {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}

/// [`RekognitionApi`] over the AWS SDK
#[derive(Clone, Debug)]
pub struct SdkRekognition {
    client: Client,
}

impl SdkRekognition {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl RekognitionApi for SdkRekognition {
    async fn create_dataset(
        &self,
        project_arn: &str,
        dataset_type: DatasetType,
    ) -> AwsResult<Option<String>> {
        let out = self
            .client
            .create_dataset()
            .project_arn(project_arn)
            .dataset_type(sdk::dataset_type_to_sdk(dataset_type))
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "CreateDataset",
                    project_arn,
                    e,
                    CreateDatasetError::is_resource_not_found_exception,
                )
            })?;
        Ok(out.dataset_arn().map(str::to_owned))
    }

    async fn describe_dataset(&self, arn: &str) -> AwsResult<DatasetDescription> {
        let out = self
            .client
            .describe_dataset()
            .dataset_arn(arn)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "DescribeDataset",
                    arn,
                    e,
                    DescribeDatasetError::is_resource_not_found_exception,
                )
            })?;

        out.dataset_description()
            .map(sdk::dataset_description_from_sdk)
            .ok_or_else(|| CloudError::EmptyResult("DescribeDataset".to_string()).into())
    }

    async fn update_dataset_entries(&self, arn: &str, ground_truth: &[u8]) -> AwsResult<()> {
        let changes = DatasetChanges::builder()
            .ground_truth(Blob::new(ground_truth.to_vec()))
            .build()
            .map_err(AwsError::build)?;

        self.client
            .update_dataset_entries()
            .dataset_arn(arn)
            .changes(changes)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "UpdateDatasetEntries",
                    arn,
                    e,
                    UpdateDatasetEntriesError::is_resource_not_found_exception,
                )
            })?;
        Ok(())
    }

    async fn delete_dataset(&self, arn: &str) -> AwsResult<()> {
        self.client
            .delete_dataset()
            .dataset_arn(arn)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "DeleteDataset",
                    arn,
                    e,
                    DeleteDatasetError::is_resource_not_found_exception,
                )
            })?;
        Ok(())
    }

    async fn create_stream_processor(
        &self,
        config: &StreamProcessorConfig,
    ) -> AwsResult<Option<String>> {
        let notification_channel = config
            .notification_channel
            .as_ref()
            .map(sdk::notification_channel_to_sdk)
            .transpose()?;

        let out = self
            .client
            .create_stream_processor()
            .name(&config.name)
            .role_arn(&config.role_arn)
            .set_kms_key_id(config.kms_key_id.clone())
            .input(sdk::input_to_sdk(&config.input))
            .output(sdk::output_to_sdk(&config.output))
            .settings(sdk::settings_to_sdk(&config.settings)?)
            .set_notification_channel(notification_channel)
            .data_sharing_preference(sdk::data_sharing_preference_to_sdk(
                config.data_sharing_preference,
            )?)
            .set_regions_of_interest(sdk::regions_of_interest_to_sdk(&config.regions_of_interest))
            .set_tags(sdk::tags_to_sdk(&config.tags))
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "CreateStreamProcessor",
                    &config.name,
                    e,
                    |_: &CreateStreamProcessorError| false,
                )
            })?;
        Ok(out.stream_processor_arn().map(str::to_owned))
    }

    async fn describe_stream_processor(&self, name: &str) -> AwsResult<StreamProcessorDescription> {
        let out = self
            .client
            .describe_stream_processor()
            .name(name)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "DescribeStreamProcessor",
                    name,
                    e,
                    DescribeStreamProcessorError::is_resource_not_found_exception,
                )
            })?;
        Ok(sdk::stream_processor_from_sdk(&out))
    }

    async fn update_stream_processor(
        &self,
        name: &str,
        update: &StreamProcessorUpdate,
    ) -> AwsResult<()> {
        let data_sharing_preference = update
            .data_sharing_preference
            .map(sdk::data_sharing_preference_to_sdk)
            .transpose()?;
        let parameters_to_delete = (!update.parameters_to_delete.is_empty()).then(|| {
            update
                .parameters_to_delete
                .iter()
                .copied()
                .map(sdk::parameter_to_delete_to_sdk)
                .collect()
        });

        self.client
            .update_stream_processor()
            .name(name)
            .set_settings_for_update(sdk::settings_for_update_to_sdk(update))
            .set_regions_of_interest_for_update(
                update
                    .regions_of_interest
                    .as_deref()
                    .and_then(sdk::regions_of_interest_to_sdk),
            )
            .set_data_sharing_preference_for_update(data_sharing_preference)
            .set_parameters_to_delete(parameters_to_delete)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "UpdateStreamProcessor",
                    name,
                    e,
                    UpdateStreamProcessorError::is_resource_not_found_exception,
                )
            })?;
        Ok(())
    }

    async fn delete_stream_processor(&self, name: &str) -> AwsResult<()> {
        self.client
            .delete_stream_processor()
            .name(name)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "DeleteStreamProcessor",
                    name,
                    e,
                    DeleteStreamProcessorError::is_resource_not_found_exception,
                )
            })?;
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> AwsResult<BTreeMap<String, String>> {
        let out = self
            .client
            .list_tags_for_resource()
            .resource_arn(arn)
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "ListTagsForResource",
                    arn,
                    e,
                    ListTagsForResourceError::is_resource_not_found_exception,
                )
            })?;

        Ok(out
            .tags()
            .map(|tags| {
                tags.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> AwsResult<()> {
        self.client
            .tag_resource()
            .resource_arn(arn)
            .set_tags(sdk::tags_to_sdk(tags))
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "TagResource",
                    arn,
                    e,
                    TagResourceError::is_resource_not_found_exception,
                )
            })?;
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> AwsResult<()> {
        self.client
            .untag_resource()
            .resource_arn(arn)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(|e| {
                sdk_error(
                    "UntagResource",
                    arn,
                    e,
                    UntagResourceError::is_resource_not_found_exception,
                )
            })?;
        Ok(())
    }
}
