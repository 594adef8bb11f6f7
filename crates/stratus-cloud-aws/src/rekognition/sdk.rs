//! Mapping between Rekognition domain types and aws-sdk-rekognition types

use super::dataset::{DatasetDescription, DatasetStatus, DatasetType};
use super::stream_processor::{
    BoundingBox, ConnectedHomeSettings, DataSharingPreference, FaceSearchSettings,
    NotificationChannel, ParameterToDelete, Point, RegionOfInterest, S3Destination,
    StreamProcessorConfig, StreamProcessorDescription, StreamProcessorInput,
    StreamProcessorOutput, StreamProcessorSettings, StreamProcessorStatus, StreamProcessorUpdate,
};
use crate::error::{AwsError, AwsResult};
use aws_sdk_rekognition::operation::describe_stream_processor::DescribeStreamProcessorOutput;
use aws_sdk_rekognition::primitives::DateTime as SdkDateTime;
use aws_sdk_rekognition::types as sdk;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

pub(crate) fn dataset_type_to_sdk(dataset_type: DatasetType) -> sdk::DatasetType {
    sdk::DatasetType::from(dataset_type.as_str())
}

fn timestamp(value: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

pub(crate) fn dataset_description_from_sdk(d: &sdk::DatasetDescription) -> DatasetDescription {
    let stats = d.dataset_stats();
    DatasetDescription {
        status: d
            .status()
            .map(|s| DatasetStatus::from(s.as_str()))
            .unwrap_or_else(|| DatasetStatus::Unknown(String::new())),
        status_message: d.status_message().map(str::to_owned),
        created_at: timestamp(d.creation_timestamp()),
        last_updated_at: timestamp(d.last_updated_timestamp()),
        total_entries: stats.and_then(|s| s.total_entries()),
        error_entries: stats.and_then(|s| s.error_entries()),
    }
}

pub(crate) fn input_to_sdk(input: &StreamProcessorInput) -> sdk::StreamProcessorInput {
    sdk::StreamProcessorInput::builder()
        .kinesis_video_stream(
            sdk::KinesisVideoStream::builder()
                .arn(&input.kinesis_video_stream_arn)
                .build(),
        )
        .build()
}

pub(crate) fn output_to_sdk(output: &StreamProcessorOutput) -> sdk::StreamProcessorOutput {
    sdk::StreamProcessorOutput::builder()
        .set_kinesis_data_stream(
            output
                .kinesis_data_stream_arn
                .as_ref()
                .map(|arn| sdk::KinesisDataStream::builder().arn(arn).build()),
        )
        .set_s3_destination(output.s3_destination.as_ref().map(|s3| {
            sdk::S3Destination::builder()
                .set_bucket(s3.bucket.clone())
                .set_key_prefix(s3.key_prefix.clone())
                .build()
        }))
        .build()
}

pub(crate) fn settings_to_sdk(
    settings: &StreamProcessorSettings,
) -> AwsResult<sdk::StreamProcessorSettings> {
    let connected_home = settings
        .connected_home
        .as_ref()
        .map(|home| {
            sdk::ConnectedHomeSettings::builder()
                .set_labels(Some(home.labels.clone()))
                .set_min_confidence(home.min_confidence)
                .build()
                .map_err(AwsError::build)
        })
        .transpose()?;

    let face_search = settings.face_search.as_ref().map(|face| {
        sdk::FaceSearchSettings::builder()
            .set_collection_id(face.collection_id.clone())
            .set_face_match_threshold(face.face_match_threshold)
            .build()
    });

    Ok(sdk::StreamProcessorSettings::builder()
        .set_connected_home(connected_home)
        .set_face_search(face_search)
        .build())
}

pub(crate) fn notification_channel_to_sdk(
    channel: &NotificationChannel,
) -> AwsResult<sdk::StreamProcessorNotificationChannel> {
    sdk::StreamProcessorNotificationChannel::builder()
        .sns_topic_arn(&channel.sns_topic_arn)
        .build()
        .map_err(AwsError::build)
}

pub(crate) fn data_sharing_preference_to_sdk(
    preference: DataSharingPreference,
) -> AwsResult<sdk::StreamProcessorDataSharingPreference> {
    Ok(sdk::StreamProcessorDataSharingPreference::builder()
        .opt_in(preference.opt_in)
        .build())
}

pub(crate) fn region_of_interest_to_sdk(region: &RegionOfInterest) -> sdk::RegionOfInterest {
    let bounding_box = region.bounding_box.map(|b| {
        sdk::BoundingBox::builder()
            .height(b.height)
            .left(b.left)
            .top(b.top)
            .width(b.width)
            .build()
    });
    let polygon = (!region.polygon.is_empty()).then(|| {
        region
            .polygon
            .iter()
            .map(|p| sdk::Point::builder().x(p.x).y(p.y).build())
            .collect()
    });

    sdk::RegionOfInterest::builder()
        .set_bounding_box(bounding_box)
        .set_polygon(polygon)
        .build()
}

pub(crate) fn regions_of_interest_to_sdk(
    regions: &[RegionOfInterest],
) -> Option<Vec<sdk::RegionOfInterest>> {
    (!regions.is_empty()).then(|| regions.iter().map(region_of_interest_to_sdk).collect())
}

pub(crate) fn settings_for_update_to_sdk(
    update: &StreamProcessorUpdate,
) -> Option<sdk::StreamProcessorSettingsForUpdate> {
    update.connected_home.as_ref().map(|home| {
        sdk::StreamProcessorSettingsForUpdate::builder()
            .connected_home_for_update(
                sdk::ConnectedHomeSettingsForUpdate::builder()
                    .set_labels(Some(home.labels.clone()))
                    .set_min_confidence(home.min_confidence)
                    .build(),
            )
            .build()
    })
}

pub(crate) fn parameter_to_delete_to_sdk(
    parameter: ParameterToDelete,
) -> sdk::StreamProcessorParameterToDelete {
    match parameter {
        ParameterToDelete::ConnectedHomeMinConfidence => {
            sdk::StreamProcessorParameterToDelete::ConnectedHomeMinConfidence
        }
        ParameterToDelete::RegionsOfInterest => {
            sdk::StreamProcessorParameterToDelete::RegionsOfInterest
        }
    }
}

pub(crate) fn tags_to_sdk(tags: &BTreeMap<String, String>) -> Option<HashMap<String, String>> {
    (!tags.is_empty()).then(|| {
        tags.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    })
}

fn output_from_sdk(output: &sdk::StreamProcessorOutput) -> StreamProcessorOutput {
    StreamProcessorOutput {
        kinesis_data_stream_arn: output
            .kinesis_data_stream()
            .and_then(|k| k.arn())
            .map(str::to_owned),
        s3_destination: output.s3_destination().map(|s3| S3Destination {
            bucket: s3.bucket().map(str::to_owned),
            key_prefix: s3.key_prefix().map(str::to_owned),
        }),
    }
}

fn settings_from_sdk(settings: &sdk::StreamProcessorSettings) -> StreamProcessorSettings {
    StreamProcessorSettings {
        connected_home: settings
            .connected_home()
            .map(|home| ConnectedHomeSettings {
                labels: home.labels().to_vec(),
                min_confidence: home.min_confidence(),
            }),
        face_search: settings.face_search().map(|face| FaceSearchSettings {
            collection_id: face.collection_id().map(str::to_owned),
            face_match_threshold: face.face_match_threshold(),
        }),
    }
}

fn region_of_interest_from_sdk(region: &sdk::RegionOfInterest) -> RegionOfInterest {
    RegionOfInterest {
        bounding_box: region.bounding_box().map(|b| BoundingBox {
            height: b.height().unwrap_or_default(),
            left: b.left().unwrap_or_default(),
            top: b.top().unwrap_or_default(),
            width: b.width().unwrap_or_default(),
        }),
        polygon: region
            .polygon()
            .iter()
            .map(|p| Point {
                x: p.x().unwrap_or_default(),
                y: p.y().unwrap_or_default(),
            })
            .collect(),
    }
}

pub(crate) fn stream_processor_from_sdk(
    out: &DescribeStreamProcessorOutput,
) -> StreamProcessorDescription {
    let input = StreamProcessorInput {
        kinesis_video_stream_arn: out
            .input()
            .and_then(|i| i.kinesis_video_stream())
            .and_then(|k| k.arn())
            .unwrap_or_default()
            .to_string(),
    };

    let config = StreamProcessorConfig {
        name: out.name().unwrap_or_default().to_string(),
        role_arn: out.role_arn().unwrap_or_default().to_string(),
        kms_key_id: out.kms_key_id().map(str::to_owned),
        input,
        output: out.output().map(output_from_sdk).unwrap_or_default(),
        settings: out.settings().map(settings_from_sdk).unwrap_or_default(),
        notification_channel: out.notification_channel().map(|c| NotificationChannel {
            sns_topic_arn: c.sns_topic_arn().to_string(),
        }),
        data_sharing_preference: out
            .data_sharing_preference()
            .map(|p| DataSharingPreference { opt_in: p.opt_in() })
            .unwrap_or_default(),
        regions_of_interest: out
            .regions_of_interest()
            .iter()
            .map(region_of_interest_from_sdk)
            .collect(),
        tags: BTreeMap::new(),
    };

    StreamProcessorDescription {
        arn: out.stream_processor_arn().unwrap_or_default().to_string(),
        status: out
            .status()
            .map(|s| StreamProcessorStatus::from(s.as_str()))
            .unwrap_or_else(|| StreamProcessorStatus::Unknown(String::new())),
        status_message: out.status_message().map(str::to_owned),
        config,
    }
}
