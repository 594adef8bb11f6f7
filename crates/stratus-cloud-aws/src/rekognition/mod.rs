//! Amazon Rekognition resources

pub mod dataset;
pub(crate) mod sdk;
pub mod stream_processor;

use std::sync::Mutex;
use stratus_cloud::{CloudError, OperationAction, WaitError};

/// Loose ARN shape check: `arn:partition:service:region:account:resource`
pub(crate) fn is_arn(value: &str) -> bool {
    value.starts_with("arn:") && value.splitn(6, ':').count() == 6
}

/// Status message of the most recent poll
///
/// The waiter only reports status strings; the remote status message is
/// captured here so a failure can explain itself.
#[derive(Debug, Default)]
pub(crate) struct LastStatusMessage(Mutex<Option<String>>);

impl LastStatusMessage {
    pub(crate) fn record(&self, message: Option<&str>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = message.filter(|m| !m.is_empty()).map(str::to_owned);
        }
    }

    pub(crate) fn failure(
        &self,
        action: OperationAction,
        resource: &'static str,
        id: &str,
        err: WaitError,
    ) -> CloudError {
        let message = self.0.lock().ok().and_then(|slot| slot.clone());
        CloudError::operation(action, resource, id, err.with_status_message(message).into())
    }
}
