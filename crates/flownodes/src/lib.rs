//! Standard node library
//!
//! Collection of built-in nodes for common operations

mod debug;
mod math;
mod text;
mod time;
mod transform;

pub use debug::DebugNode;
pub use math::{AddConstant, Increment, Scale, Sum};
pub use text::{Concat, Constant};
pub use time::DelayNode;
pub use transform::{JsonParseNode, JsonStringifyNode};

use flowcore::{NodeError, Value};

/// Numeric input at `index`, or a typed error naming the position
pub(crate) fn number_input(inputs: &[Value], index: usize) -> Result<f64, NodeError> {
    let value = flowcore::require_input(inputs, index)?;
    value.as_f64().ok_or_else(|| NodeError::InvalidInputType {
        field: format!("#{}", index),
        expected: "number".to_string(),
        actual: value.type_name().to_string(),
    })
}
