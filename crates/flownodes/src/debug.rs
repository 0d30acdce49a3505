use flowcore::{Node, NodeContext, NodeError, Value};
use tracing::info;

/// Logs its inputs and passes the first one through
pub struct DebugNode;

impl Node for DebugNode {
    fn node_type(&self) -> &str {
        "debug.log"
    }

    fn call(&self, ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        for (i, value) in inputs.iter().enumerate() {
            info!(node_id = %ctx.node_id, input = i, %value, "debug");
            ctx.events.info(format!("  #{}: {}", i, value));
        }

        Ok(inputs.first().cloned().unwrap_or_default())
    }
}
