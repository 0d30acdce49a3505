//! Workflow execution runtime
//!
//! This crate provides the orchestrator that drains the work queue, the
//! dependency registry, the middleware stack around node calls, and the
//! join variants that chain nodes together.

mod aggregate;
pub mod join;
mod queue;
mod registry;
mod runtime;
mod stack;

pub use aggregate::Aggregator;
pub use join::{Decision, Fork, Merge, Sequence, Switch, SyncMerge};
pub use queue::{QueueEntry, WorkQueue};
pub use registry::{DependencyRegistry, Invoke};
pub use runtime::{default_app, App, RuntimeConfig};
pub use stack::{EventLayer, Invocation, Layer, Next, Stack, TracingLayer};
