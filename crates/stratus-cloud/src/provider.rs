//! Managed resource trait definition

use crate::error::Result;
use crate::waiter::WaitSpecBuilder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// Lifecycle contract every managed resource type implements
///
/// The host owns the declarative state; a resource only translates between
/// its typed configuration and the remote API, and blocks in each mutating
/// call until the remote side has settled.
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Typed user configuration
    type Config: Send + Sync;

    /// Typed state recorded after a successful operation
    type State: Send + Sync;

    /// Returns the resource type name (e.g., "aws_rekognition_dataset")
    fn type_name(&self) -> &'static str;

    /// Returns the human readable name used in error messages
    fn display_name(&self) -> &'static str;

    /// Timeouts applied when the configuration doesn't override them
    fn default_timeouts(&self) -> Timeouts;

    /// Identifier of a recorded resource (ARN or name)
    fn id<'a>(&self, state: &'a Self::State) -> &'a str;

    /// Whether moving from `prior` to `desired` needs a delete and re-create
    fn requires_replace(&self, desired: &Self::Config, prior: &Self::State) -> bool;

    /// Whether `desired` differs from `prior` at all
    fn has_changes(&self, desired: &Self::Config, prior: &Self::State) -> bool;

    /// Create the resource and wait until it is usable
    async fn create(&self, desired: &Self::Config, timeouts: &Timeouts) -> Result<Self::State>;

    /// Refresh the recorded state; `None` means the resource is gone
    async fn read(&self, prior: &Self::State) -> Result<Option<Self::State>>;

    /// Apply in-place changes and wait until they are live
    async fn update(
        &self,
        desired: &Self::Config,
        prior: &Self::State,
        timeouts: &Timeouts,
    ) -> Result<Self::State>;

    /// Delete the resource and wait until it is gone
    async fn delete(&self, prior: &Self::State, timeouts: &Timeouts) -> Result<()>;
}

/// Per-operation time budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    /// Same budget for every operation
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    /// Replace the budgets that are set in `overrides`
    pub fn with_overrides(
        self,
        create: Option<Duration>,
        update: Option<Duration>,
        delete: Option<Duration>,
    ) -> Self {
        Self {
            create: create.unwrap_or(self.create),
            update: update.unwrap_or(self.update),
            delete: delete.unwrap_or(self.delete),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(30 * 60))
    }
}

/// Caller-supplied waiter tuning layered over a resource's defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitTuning {
    pub poll_interval: Option<Duration>,
    pub not_found_checks: Option<u32>,
    pub continuous_target_occurrence: Option<u32>,
}

impl WaitTuning {
    pub fn apply<S>(&self, mut builder: WaitSpecBuilder<S>) -> WaitSpecBuilder<S>
    where
        S: PartialEq + Display,
    {
        if let Some(interval) = self.poll_interval {
            builder = builder.poll_interval(interval);
        }
        if let Some(checks) = self.not_found_checks {
            builder = builder.not_found_checks(checks);
        }
        if let Some(hits) = self.continuous_target_occurrence {
            builder = builder.continuous_target_occurrence(hits);
        }
        builder
    }
}
