//! State-transition waiter (exponential backoff)
//!
//! Bridges a synchronous create/update/delete onto an eventually consistent
//! remote API: the caller hands over the pending and target status sets plus
//! a closure that describes the resource once, and the waiter keeps polling
//! until the observed status settles in the target set, leaves the allowed
//! sets, or the time budget runs out.
//!
//! Per-resource waiters are plain [`WaitSpec`] values; the polling logic
//! lives here only once.

use crate::error::{CloudError, Result, WaitError};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;

/// Default number of consecutive "not found" polls tolerated
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// First backoff step between polls
pub const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Backoff ceiling between polls
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Deadline used when `started + timeout` doesn't fit in an `Instant` (~30 years)
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Result of a single poll against the remote system
#[derive(Debug, Clone, PartialEq)]
pub enum Observation<T, S> {
    /// The resource does not exist (yet, or any more)
    NotFound,
    /// The resource exists and reports `status`
    Found { resource: T, status: S },
}

impl<T, S> Observation<T, S> {
    pub fn found(resource: T, status: S) -> Self {
        Observation::Found { resource, status }
    }

    /// Build an observation from a finder result, deriving the status from the resource.
    pub fn from_option(resource: Option<T>, status_of: impl FnOnce(&T) -> S) -> Self {
        match resource {
            Some(resource) => {
                let status = status_of(&resource);
                Observation::Found { resource, status }
            }
            None => Observation::NotFound,
        }
    }
}

/// Wait specification: what to wait for and how patiently
#[derive(Debug, Clone)]
pub struct WaitSpec<S> {
    pending: Vec<S>,
    target: Vec<S>,
    timeout: Duration,
    continuous_target_occurrence: u32,
    not_found_checks: u32,
    delay: Duration,
    min_poll_interval: Duration,
    max_poll_interval: Duration,
    poll_interval: Option<Duration>,
}

impl<S> WaitSpec<S>
where
    S: PartialEq + Display,
{
    pub fn builder(timeout: Duration) -> WaitSpecBuilder<S> {
        WaitSpecBuilder::new(timeout)
    }

    pub fn pending(&self) -> &[S] {
        &self.pending
    }

    pub fn target(&self) -> &[S] {
        &self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn continuous_target_occurrence(&self) -> u32 {
        self.continuous_target_occurrence
    }

    pub fn not_found_checks(&self) -> u32 {
        self.not_found_checks
    }

    /// Same specification with a different time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sleep before poll number `attempt + 1` (zero-based attempt of the previous poll).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if let Some(fixed) = self.poll_interval {
            return fixed;
        }
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.min_poll_interval
            .saturating_mul(factor)
            .min(self.max_poll_interval)
    }

    /// Target statuses as strings, for diagnostics.
    fn expected(&self) -> Vec<String> {
        self.target.iter().map(|s| s.to_string()).collect()
    }

    /// Poll until the resource settles. See [`wait_for_status`].
    pub async fn wait<T, F, Fut>(
        &self,
        poll: F,
    ) -> std::result::Result<WaitOutcome<T, S>, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<T, S>>>,
    {
        wait_for_status(self, poll).await
    }

    /// [`WaitSpec::wait`] that stops with `WaitError::Cancelled` once `cancel` fires.
    pub async fn wait_with_cancel<T, F, Fut>(
        &self,
        poll: F,
        cancel: &CancellationToken,
    ) -> std::result::Result<WaitOutcome<T, S>, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<T, S>>>,
    {
        wait_for_status_with_cancel(self, poll, cancel).await
    }
}

/// Builder for [`WaitSpec`]
#[derive(Debug, Clone)]
pub struct WaitSpecBuilder<S> {
    spec: WaitSpec<S>,
}

impl<S> WaitSpecBuilder<S>
where
    S: PartialEq + Display,
{
    pub fn new(timeout: Duration) -> Self {
        Self {
            spec: WaitSpec {
                pending: Vec::new(),
                target: Vec::new(),
                timeout,
                continuous_target_occurrence: 1,
                not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
                delay: Duration::ZERO,
                min_poll_interval: DEFAULT_MIN_POLL_INTERVAL,
                max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
                poll_interval: None,
            },
        }
    }

    pub fn pending(mut self, statuses: impl IntoIterator<Item = S>) -> Self {
        self.spec.pending = statuses.into_iter().collect();
        self
    }

    /// Target statuses. An empty target set means "wait until the resource is gone".
    pub fn target(mut self, statuses: impl IntoIterator<Item = S>) -> Self {
        self.spec.target = statuses.into_iter().collect();
        self
    }

    /// Number of target observations in a row required before succeeding.
    pub fn continuous_target_occurrence(mut self, hits: u32) -> Self {
        self.spec.continuous_target_occurrence = hits.max(1);
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.spec.not_found_checks = checks;
        self
    }

    /// Wait before the first poll.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.spec.delay = delay;
        self
    }

    /// Fixed interval between polls, replacing the exponential backoff.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.spec.poll_interval = Some(interval);
        self
    }

    pub fn min_poll_interval(mut self, interval: Duration) -> Self {
        self.spec.min_poll_interval = interval;
        self
    }

    pub fn max_poll_interval(mut self, interval: Duration) -> Self {
        self.spec.max_poll_interval = interval;
        self
    }

    pub fn build(self) -> Result<WaitSpec<S>> {
        let spec = self.spec;

        if let Some(overlap) = spec.target.iter().find(|s| spec.pending.contains(s)) {
            return Err(CloudError::InvalidConfig(format!(
                "status '{}' is both pending and target",
                overlap
            )));
        }

        if spec.pending.is_empty() && spec.target.is_empty() {
            return Err(CloudError::InvalidConfig(
                "wait specification needs at least one pending or target status".to_string(),
            ));
        }

        if spec.min_poll_interval > spec.max_poll_interval {
            return Err(CloudError::InvalidConfig(format!(
                "minimum poll interval {:?} exceeds maximum {:?}",
                spec.min_poll_interval, spec.max_poll_interval
            )));
        }

        Ok(spec)
    }
}

/// Successful end of a wait
#[derive(Debug, Clone)]
pub struct WaitOutcome<T, S> {
    /// Last observed resource; `None` when the target was absence
    pub resource: Option<T>,

    /// Last observed status; `None` when the target was absence
    pub status: Option<S>,

    /// Number of polls performed
    pub polls: u32,

    /// Time spent waiting
    pub elapsed: Duration,
}

/// What the caller should do after classifying one observation
#[derive(Debug)]
enum Step<T, S> {
    Continue,
    Done(Observation<T, S>),
}

/// Counters of a single wait; lives only as long as one call
#[derive(Debug)]
struct Tracker<'a, S> {
    spec: &'a WaitSpec<S>,
    not_found: u32,
    target_hits: u32,
    last_status: Option<String>,
}

impl<'a, S> Tracker<'a, S>
where
    S: PartialEq + Display,
{
    fn new(spec: &'a WaitSpec<S>) -> Self {
        Self {
            spec,
            not_found: 0,
            target_hits: 0,
            last_status: None,
        }
    }

    fn observe<T>(
        &mut self,
        observation: Observation<T, S>,
    ) -> std::result::Result<Step<T, S>, WaitError> {
        let spec = self.spec;

        match observation {
            Observation::NotFound if spec.target.is_empty() => {
                self.target_hits += 1;
                if self.target_hits >= spec.continuous_target_occurrence {
                    return Ok(Step::Done(Observation::NotFound));
                }
                Ok(Step::Continue)
            }
            Observation::NotFound => {
                self.not_found += 1;
                self.target_hits = 0;
                if self.not_found > spec.not_found_checks {
                    return Err(WaitError::NotFoundExhausted {
                        checks: spec.not_found_checks,
                        last_status: self.last_status.clone(),
                    });
                }
                tracing::debug!(
                    "Resource not found ({}/{}), still waiting",
                    self.not_found,
                    spec.not_found_checks
                );
                Ok(Step::Continue)
            }
            Observation::Found { resource, status } => {
                self.not_found = 0;
                self.last_status = Some(status.to_string());

                if spec.target.contains(&status) {
                    self.target_hits += 1;
                    if self.target_hits >= spec.continuous_target_occurrence {
                        return Ok(Step::Done(Observation::Found { resource, status }));
                    }
                    tracing::debug!(
                        "Target state '{}' seen {}/{} times",
                        status,
                        self.target_hits,
                        spec.continuous_target_occurrence
                    );
                    return Ok(Step::Continue);
                }

                if spec.pending.contains(&status) {
                    self.target_hits = 0;
                    return Ok(Step::Continue);
                }

                Err(WaitError::UnexpectedState {
                    status: status.to_string(),
                    expected: spec.expected(),
                    message: None,
                })
            }
        }
    }

    fn timeout(&self) -> WaitError {
        WaitError::Timeout {
            timeout: self.spec.timeout,
            last_status: self.last_status.clone(),
            expected: self.spec.expected(),
        }
    }

    fn cancelled(&self) -> WaitError {
        WaitError::Cancelled {
            last_status: self.last_status.clone(),
        }
    }
}

/// Poll until the observed status is stable in the target set.
///
/// # Returns
/// * `Ok(WaitOutcome)` - target reached `continuous_target_occurrence` times in a row
/// * `Err(WaitError::UnexpectedState)` - status outside pending and target
/// * `Err(WaitError::NotFoundExhausted)` - more than `not_found_checks` consecutive absences
/// * `Err(WaitError::Timeout)` - time budget spent without a terminal classification
/// * `Err(WaitError::Poll)` - the poll itself failed
pub async fn wait_for_status<T, S, F, Fut>(
    spec: &WaitSpec<S>,
    poll: F,
) -> std::result::Result<WaitOutcome<T, S>, WaitError>
where
    S: PartialEq + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation<T, S>>>,
{
    wait_for_status_with_cancel(spec, poll, &CancellationToken::new()).await
}

/// [`wait_for_status`] that also stops with `WaitError::Cancelled` once `cancel` fires.
///
/// Cancellation aborts an in-flight poll as well as the sleep between polls.
pub async fn wait_for_status_with_cancel<T, S, F, Fut>(
    spec: &WaitSpec<S>,
    mut poll: F,
    cancel: &CancellationToken,
) -> std::result::Result<WaitOutcome<T, S>, WaitError>
where
    S: PartialEq + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation<T, S>>>,
{
    let started = Instant::now();
    let deadline = started
        .checked_add(spec.timeout)
        .unwrap_or_else(|| started + FAR_FUTURE);
    let mut tracker = Tracker::new(spec);
    let mut polls: u32 = 0;
    let mut next_sleep = spec.delay;

    loop {
        if !next_sleep.is_zero() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(tracker.cancelled()),
                _ = sleep(next_sleep.min(remaining)) => {}
            }
        }

        if Instant::now() >= deadline {
            tracing::debug!("Wait timed out after {} polls", polls);
            return Err(tracker.timeout());
        }

        polls += 1;
        let observation = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(tracker.cancelled()),
            result = timeout_at(deadline, poll()) => match result {
                Ok(Ok(observation)) => observation,
                Ok(Err(e)) => return Err(WaitError::Poll(Box::new(e))),
                Err(_) => return Err(tracker.timeout()),
            },
        };

        if let Step::Done(last) = tracker.observe(observation)? {
            let (resource, status) = match last {
                Observation::Found { resource, status } => (Some(resource), Some(status)),
                Observation::NotFound => (None, None),
            };
            tracing::debug!("Wait finished after {} polls", polls);
            return Ok(WaitOutcome {
                resource,
                status,
                polls,
                elapsed: started.elapsed(),
            });
        }

        tracing::trace!(
            "Poll {} classified as pending (last state: {:?})",
            polls,
            tracker.last_status
        );
        next_sleep = spec.delay_for_attempt(polls - 1);
    }
}
