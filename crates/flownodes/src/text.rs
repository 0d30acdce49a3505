use flowcore::{Node, NodeContext, NodeError, Value};

/// Emit a fixed value regardless of inputs
pub struct Constant {
    pub value: Value,
}

impl Constant {
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into() }
    }
}

impl Node for Constant {
    fn node_type(&self) -> &str {
        "value.constant"
    }

    fn call(&self, _ctx: &NodeContext, _inputs: &[Value]) -> Result<Value, NodeError> {
        Ok(self.value.clone())
    }
}

/// Join values into one string.
///
/// A single array input is joined element-wise; otherwise every input is
/// joined. Strings are used as is, anything else through `Display`.
pub struct Concat {
    pub separator: String,
}

impl Concat {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

fn piece(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Node for Concat {
    fn node_type(&self) -> &str {
        "text.concat"
    }

    fn call(&self, _ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        let parts: Vec<String> = match inputs {
            [Value::Array(items)] => items.iter().map(piece).collect(),
            _ => inputs.iter().map(piece).collect(),
        };
        Ok(Value::String(parts.join(&self.separator)))
    }
}
