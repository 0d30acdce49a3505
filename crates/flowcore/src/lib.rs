//! Core abstractions for the flow engine
//!
//! This crate provides the fundamental types and traits that the runtime
//! and node library depend on: values, nodes, provenance records, the join
//! seam, run state and lifecycle events. It has no scheduling logic.

mod config;
mod error;
pub mod events;
mod join;
mod node;
pub mod provenance;
mod state;
mod value;

pub use config::JoinConfig;
pub use error::{ConfigError, FlowError, NodeError};
pub use events::*;
pub use join::{Dispatcher, Join};
pub use node::{require_input, FnNode, Node, NodeContext, NodeId, NodeRef};
pub use provenance::{Input, Producer, Record, TrailStep};
pub use state::{RunState, StateHandle};
pub use value::Value;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
