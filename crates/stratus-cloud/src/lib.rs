//! Stratus Cloud core
//!
//! Provider-neutral building blocks for managing cloud resources
//! declaratively: the lifecycle contract each resource type implements,
//! plan/apply bookkeeping, and the state-transition waiter that turns an
//! eventually consistent remote API into a blocking create/update/delete.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                orchestration host                │
//! │            (plan / apply / refresh)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 stratus-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait ManagedResource { create, ... }  │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │ plan / apply │  │ state-transition     │     │
//! │  │   actions    │  │ waiter (WaitSpec)    │     │
//! │  └──────────────┘  └──────────────────────┘     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ stratus-cloud │
//!           │     -aws      │
//!           └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod provider;
pub mod waiter;

// Re-exports
pub use action::{
    Action, ActionResult, ActionType, ApplyResult, apply_change, plan_change, reconcile,
};
pub use error::{CloudError, OperationAction, Result, WaitError};
pub use provider::{ManagedResource, Timeouts, WaitTuning};
pub use waiter::{
    Observation, WaitOutcome, WaitSpec, WaitSpecBuilder, wait_for_status,
    wait_for_status_with_cancel,
};
