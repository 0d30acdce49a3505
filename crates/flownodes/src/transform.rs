use flowcore::{require_input, Node, NodeContext, NodeError, Value};

/// Parse JSON string to Value
pub struct JsonParseNode;

impl Node for JsonParseNode {
    fn node_type(&self) -> &str {
        "transform.json_parse"
    }

    fn call(&self, _ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        let input = require_input(inputs, 0)?;
        let text = input.as_str().ok_or_else(|| NodeError::InvalidInputType {
            field: "json".to_string(),
            expected: "string".to_string(),
            actual: input.type_name().to_string(),
        })?;

        let parsed: serde_json::Value =
            serde_json::from_str(text).map_err(|e| NodeError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        Ok(Value::Json(parsed))
    }
}

/// Stringify Value to JSON
pub struct JsonStringifyNode;

impl Node for JsonStringifyNode {
    fn node_type(&self) -> &str {
        "transform.json_stringify"
    }

    fn call(&self, _ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        let value = require_input(inputs, 0)?;

        let json_str = match value {
            Value::Json(json) => serde_json::to_string(json),
            other => serde_json::to_string(other),
        }
        .map_err(|e| NodeError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        Ok(Value::String(json_str))
    }
}
