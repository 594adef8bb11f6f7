//! Encryption configuration of firewalls, policies and rule groups

use crate::error::{AwsError, AwsResult};
use aws_sdk_networkfirewall::types as sdk;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionType {
    #[default]
    AwsOwnedKmsKey,
    CustomerKms,
}

impl EncryptionType {
    fn to_sdk(self) -> sdk::EncryptionType {
        match self {
            EncryptionType::AwsOwnedKmsKey => sdk::EncryptionType::AwsOwnedKmsKey,
            EncryptionType::CustomerKms => sdk::EncryptionType::CustomerKms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfiguration {
    #[serde(default)]
    pub key_id: Option<String>,

    #[serde(default, rename = "type")]
    pub encryption_type: EncryptionType,
}

/// Request form; an unset configuration means an AWS owned key
pub fn expand_encryption_configuration(
    config: Option<&EncryptionConfiguration>,
) -> AwsResult<sdk::EncryptionConfiguration> {
    let default = EncryptionConfiguration::default();
    let config = config.unwrap_or(&default);

    sdk::EncryptionConfiguration::builder()
        .set_key_id(config.key_id.clone())
        .r#type(config.encryption_type.to_sdk())
        .build()
        .map_err(AwsError::build)
}

/// User form; AWS owned keys flatten to `None` so they don't show as a diff
pub fn flatten_encryption_configuration(
    config: Option<&sdk::EncryptionConfiguration>,
) -> Option<EncryptionConfiguration> {
    let config = config?;
    match config.r#type() {
        sdk::EncryptionType::CustomerKms => Some(EncryptionConfiguration {
            key_id: config.key_id().map(str::to_owned),
            encryption_type: EncryptionType::CustomerKms,
        }),
        sdk::EncryptionType::AwsOwnedKmsKey => None,
        other => {
            tracing::warn!("Ignoring unknown encryption type {}", other.as_str());
            None
        }
    }
}
