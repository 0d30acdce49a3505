use crate::number_input;
use flowcore::{Node, NodeContext, NodeError, Value};

/// Add one to the first input
pub struct Increment;

impl Node for Increment {
    fn node_type(&self) -> &str {
        "math.increment"
    }

    fn call(&self, _ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        Ok(Value::from(number_input(inputs, 0)? + 1.0))
    }
}

/// Multiply the first input by a fixed factor
pub struct Scale {
    pub factor: f64,
}

impl Scale {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl Node for Scale {
    fn node_type(&self) -> &str {
        "math.scale"
    }

    fn call(&self, _ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        Ok(Value::from(number_input(inputs, 0)? * self.factor))
    }
}

/// Add a fixed amount to the first input
pub struct AddConstant {
    pub amount: f64,
}

impl AddConstant {
    pub fn new(amount: f64) -> Self {
        Self { amount }
    }
}

impl Node for AddConstant {
    fn node_type(&self) -> &str {
        "math.add"
    }

    fn call(&self, _ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        Ok(Value::from(number_input(inputs, 0)? + self.amount))
    }
}

/// Sum every number in the inputs, descending into arrays
pub struct Sum;

fn accumulate(value: &Value, total: &mut f64) -> Result<(), NodeError> {
    match value {
        Value::Number(n) => *total += n,
        Value::Array(items) => {
            for item in items {
                accumulate(item, total)?;
            }
        }
        other => {
            return Err(NodeError::InvalidInputType {
                field: "sum".to_string(),
                expected: "number or array".to_string(),
                actual: other.type_name().to_string(),
            })
        }
    }
    Ok(())
}

impl Node for Sum {
    fn node_type(&self) -> &str {
        "math.sum"
    }

    fn call(&self, _ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        let mut total = 0.0;
        for input in inputs {
            accumulate(input, &mut total)?;
        }
        Ok(Value::from(total))
    }
}
