//! AWS resources for Stratus
//!
//! - Rekognition Custom Labels datasets ([`DatasetResource`])
//! - Rekognition Video stream processors ([`StreamProcessorResource`])
//! - Network Firewall custom actions and encryption configuration ([`networkfirewall`])
//!
//! Every lifecycle call blocks until the remote side settles, using the
//! state-transition waiter from `stratus-cloud`.

pub mod client;
pub mod error;
pub mod networkfirewall;
pub mod rekognition;

pub use client::{RekognitionApi, SdkRekognition};
pub use error::{AwsError, AwsResult};
pub use rekognition::dataset::{
    DatasetConfig, DatasetDescription, DatasetResource, DatasetState, DatasetStatus, DatasetType,
};
pub use rekognition::stream_processor::{
    StreamProcessorConfig, StreamProcessorDescription, StreamProcessorResource,
    StreamProcessorState, StreamProcessorStatus, StreamProcessorUpdate,
};

use std::sync::Arc;
use stratus_cloud::{ManagedResource, Timeouts, WaitTuning};
use stratus_config::ProviderConfig;
use tokio_util::sync::CancellationToken;

/// Entry point: AWS clients plus the user's provider configuration
pub struct AwsProvider {
    rekognition: Arc<dyn RekognitionApi>,
    config: ProviderConfig,
    cancel: CancellationToken,
}

impl AwsProvider {
    /// Build SDK clients from the default credential chain
    pub async fn connect(config: ProviderConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        tracing::debug!("AWS region: {:?}", sdk_config.region());

        Self::with_client(Arc::new(SdkRekognition::from_conf(&sdk_config)), config)
    }

    pub fn with_client(rekognition: Arc<dyn RekognitionApi>, config: ProviderConfig) -> Self {
        Self {
            rekognition,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Resources handed out afterwards stop waiting once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Waiter tuning from the `waiter` section of the configuration
    pub fn tuning(&self) -> WaitTuning {
        let waiter = &self.config.waiter;
        WaitTuning {
            poll_interval: waiter.poll_interval,
            not_found_checks: waiter.not_found_checks,
            continuous_target_occurrence: waiter.continuous_target_occurrence,
        }
    }

    /// A resource's default timeouts with the configured overrides applied
    pub fn timeouts<R: ManagedResource>(&self, resource: &R) -> Timeouts {
        let overrides = self.config.timeouts_for(resource.type_name());
        resource
            .default_timeouts()
            .with_overrides(overrides.create, overrides.update, overrides.delete)
    }

    pub fn dataset(&self) -> DatasetResource {
        DatasetResource::new(self.rekognition.clone())
            .with_tuning(self.tuning())
            .with_cancellation(self.cancel.clone())
    }

    pub fn stream_processor(&self) -> StreamProcessorResource {
        StreamProcessorResource::new(self.rekognition.clone())
            .with_tuning(self.tuning())
            .with_cancellation(self.cancel.clone())
    }
}
