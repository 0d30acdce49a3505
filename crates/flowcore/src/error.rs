use crate::RunState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Circular dependency: {}", .trace.join(" -> "))]
    CircularDependency { trace: Vec<String> },

    #[error("Duplicate result from '{node}' for slot ({row}, {column}) before prior group consumed")]
    SlotCollision {
        row: usize,
        column: usize,
        node: String,
    },

    #[error("Switch selected target {index} but only {targets} targets exist")]
    UnmappedSwitch { index: usize, targets: usize },

    #[error("Join received a result from '{node}', which is not one of its sources")]
    UnknownSource { node: String },

    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: RunState, action: &'static str },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// True for the termination signal raised by `NodeContext::check_terminate`.
    pub fn is_termination(&self) -> bool {
        matches!(self, FlowError::Node(NodeError::Terminated))
    }

    /// Invariant violations that are never swallowed by the run loop.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            FlowError::CircularDependency { .. }
                | FlowError::SlotCollision { .. }
                | FlowError::UnmappedSwitch { .. }
                | FlowError::UnknownSource { .. }
        )
    }

    /// Stable short name of the error kind, used as the `action` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Node(e) => e.kind(),
            FlowError::CircularDependency { .. } => "circular_dependency",
            FlowError::SlotCollision { .. } => "slot_collision",
            FlowError::UnmappedSwitch { .. } => "unmapped_switch",
            FlowError::UnknownSource { .. } => "unknown_source",
            FlowError::InvalidTransition { .. } => "invalid_transition",
            FlowError::Config(_) => "config",
            FlowError::Serialization(_) => "serialization",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Raised at a termination check-point; only the run loop intercepts it.
    #[error("Terminated")]
    Terminated,
}

impl NodeError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NodeError::MissingInput(_) => "missing_input",
            NodeError::InvalidInputType { .. } => "invalid_input_type",
            NodeError::Configuration(_) => "configuration",
            NodeError::ExecutionFailed(_) => "execution_failed",
            NodeError::Terminated => "terminated",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown option '{option}', expected one of: {expected}")]
    UnknownOption { option: String, expected: String },

    #[error("Option '{option}' expects a boolean, got {actual}")]
    NotABoolean { option: String, actual: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}
