// crates/flowcli/src/scenarios.rs

use clap::ValueEnum;
use flowcore::{Input, JoinConfig, NodeRef, Value};
use flownodes::{AddConstant, Concat, Constant, DebugNode, Increment, Scale, Sum};
use flowruntime::{App, Fork, Sequence, Switch, SyncMerge};

/// Built-in demo workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Two unconnected increments
    Independent,
    /// double -> add5
    Chain,
    /// Two constants synchronized into a concat
    Join,
    /// One value forked into inc and double, then summed
    Fork,
    /// Each array element routed by parity
    Switch,
}

impl Scenario {
    pub fn describe(self) -> &'static str {
        match self {
            Scenario::Independent => "increment two values with two unconnected nodes",
            Scenario::Chain => "double the input and add 5",
            Scenario::Join => "wait for two constants and concatenate them",
            Scenario::Fork => "fork into inc and double, sync-merge into sum",
            Scenario::Switch => "halve even elements, increment odd ones",
        }
    }

    /// Input used when none is given on the command line.
    pub fn default_input(self) -> Value {
        match self {
            Scenario::Independent => Value::Array(vec![Value::from(0), Value::from(1)]),
            Scenario::Chain => Value::from(3),
            Scenario::Join => Value::Array(vec![Value::from("x"), Value::from("y")]),
            Scenario::Fork => Value::from(10),
            Scenario::Switch => Value::Array((1..=6).map(Value::from).collect()),
        }
    }

    /// Wire the scenario's nodes and enqueue its entry points on `app`.
    /// Returns the nodes to validate before running.
    pub fn build(self, app: &App, input: Value) -> Vec<NodeRef> {
        match self {
            Scenario::Independent => {
                elements(input)
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let node = NodeRef::new(format!("inc{}", i + 1), Increment);
                        app.enqueue(&node, [value]);
                        node
                    })
                    .collect()
            }
            Scenario::Chain => {
                let double = NodeRef::new("double", Scale::new(2.0));
                let add5 = NodeRef::new("add5", AddConstant::new(5.0));
                Sequence::connect(&double, &add5, JoinConfig::default());
                app.enqueue(&double, [input]);
                vec![double]
            }
            Scenario::Join => {
                let sources: Vec<NodeRef> = elements(input)
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| NodeRef::new(format!("const{}", i + 1), Constant::new(value)))
                    .collect();
                let concat = NodeRef::new("concat", Concat::new(","));
                SyncMerge::connect(&sources, &concat, JoinConfig::default().inline());
                for source in &sources {
                    app.enqueue(source, Vec::<Input>::new());
                }
                sources
            }
            Scenario::Fork => {
                let source = NodeRef::new("source", Constant::new(input));
                let inc = NodeRef::new("inc", Increment);
                let double = NodeRef::new("double", Scale::new(2.0));
                let sum = NodeRef::new("sum", Sum);
                Fork::connect(&source, &[inc.clone(), double.clone()], JoinConfig::default());
                SyncMerge::connect(&[inc, double], &sum, JoinConfig::default());
                app.enqueue(&source, Vec::<Input>::new());
                vec![source]
            }
            Scenario::Switch => {
                let source = NodeRef::new("numbers", Constant::new(input));
                let classify = NodeRef::new("classify", DebugNode);
                let halve = NodeRef::new("halve", Scale::new(0.5));
                let inc = NodeRef::new("inc", Increment);
                Sequence::connect(&source, &classify, JoinConfig::default().iterate());
                Switch::connect(
                    &classify,
                    &[halve, inc],
                    |record| {
                        let n = record.value().as_f64()?;
                        (n.fract() == 0.0).then_some((n.abs() as u64 % 2) as usize)
                    },
                    JoinConfig::default(),
                );
                app.enqueue(&source, Vec::<Input>::new());
                vec![source]
            }
        }
    }
}

fn elements(input: Value) -> Vec<Value> {
    match input {
        Value::Array(items) => items,
        other => vec![other],
    }
}
