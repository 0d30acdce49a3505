//! Provenance records
//!
//! Every successful node call produces a [`Record`] that remembers who
//! produced the value and which records it was derived from. Records are
//! immutable and shared through `Arc`, so one record can be the source of
//! many descendants and the whole history forms a DAG.

mod dump;

pub use dump::{dump, dump_string};

use crate::{NodeRef, Value};
use std::fmt;
use std::sync::Arc;

/// Who produced a record's value
#[derive(Debug, Clone)]
pub enum Producer {
    /// Supplied from outside the engine (or a merge point).
    External,
    /// Returned by a node call.
    Node(NodeRef),
    /// Positional child created by `Record::fork`.
    Index(usize),
}

#[derive(Debug, Clone)]
enum Sources {
    None,
    One(Arc<Record>),
    Many(Vec<Arc<Record>>),
}

impl Sources {
    fn from_vec(mut sources: Vec<Arc<Record>>) -> Self {
        match sources.len() {
            0 => Sources::None,
            1 => Sources::One(sources.remove(0)),
            _ => Sources::Many(sources),
        }
    }

    fn as_slice(&self) -> &[Arc<Record>] {
        match self {
            Sources::None => &[],
            Sources::One(source) => std::slice::from_ref(source),
            Sources::Many(sources) => sources,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    producer: Producer,
    value: Value,
    sources: Sources,
}

/// One step of a reconstructed trail
#[derive(Debug, Clone, PartialEq)]
pub enum TrailStep {
    Value(Value),
    /// Independent trails of branches converging at the next step.
    Branches(Vec<Vec<TrailStep>>),
}

impl From<Value> for TrailStep {
    fn from(value: Value) -> Self {
        TrailStep::Value(value)
    }
}

impl Record {
    /// Build a record. Zero sources means "no sources"; a single source is
    /// stored unwrapped; two or more mark a merge point.
    pub fn new(producer: Producer, value: Value, sources: Vec<Arc<Record>>) -> Arc<Record> {
        Arc::new(Record {
            producer,
            value,
            sources: Sources::from_vec(sources),
        })
    }

    /// Zero-source record for a value entering the engine from outside.
    pub fn external(value: impl Into<Value>) -> Arc<Record> {
        Record::new(Producer::External, value.into(), Vec::new())
    }

    pub fn empty() -> Arc<Record> {
        Record::new(Producer::External, Value::Null, Vec::new())
    }

    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    /// The producing node, if the record came from a node call.
    pub fn node(&self) -> Option<&NodeRef> {
        match &self.producer {
            Producer::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn sources(&self) -> &[Arc<Record>] {
        self.sources.as_slice()
    }

    pub fn is_merge(&self) -> bool {
        matches!(self.sources, Sources::Many(_))
    }

    /// Display key of the producer.
    pub fn key(&self) -> String {
        match &self.producer {
            Producer::Node(node) => node.name().to_string(),
            Producer::Index(i) => format!("[{}]", i),
            Producer::External if self.is_merge() => "<merge>".to_string(),
            Producer::External => "<input>".to_string(),
        }
    }

    /// Split an iterable value into one child per element, each keyed by its
    /// position and sourced from `self`. Non-iterable values yield `[self]`.
    pub fn fork(self: &Arc<Self>) -> Vec<Arc<Record>> {
        if !self.value.is_iterable() {
            return vec![Arc::clone(self)];
        }
        self.value
            .elements()
            .into_iter()
            .enumerate()
            .map(|(i, item)| Record::new(Producer::Index(i), item, vec![Arc::clone(self)]))
            .collect()
    }

    /// Derived record holding `[value]`, keyed like `self`.
    pub fn wrap(self: &Arc<Self>) -> Arc<Record> {
        Record::new(
            self.producer.clone(),
            Value::Array(vec![self.value.clone()]),
            vec![Arc::clone(self)],
        )
    }

    /// Merge records into one.
    ///
    /// No records give a fresh empty record and a single record is returned
    /// as is. Otherwise the result's sources are exactly `records` and its
    /// value is the list of their values.
    pub fn merge(records: Vec<Arc<Record>>) -> Arc<Record> {
        match records.len() {
            0 => Record::empty(),
            1 => records.into_iter().next().unwrap_or_else(Record::empty),
            _ => {
                let value = Value::Array(records.iter().map(|r| r.value.clone()).collect());
                Record::new(Producer::External, value, records)
            }
        }
    }

    /// Ancestry of this record, oldest first.
    ///
    /// Single-source chains are flattened; a merge point contributes one
    /// `Branches` step holding each converging branch's own trail.
    pub fn trail(&self) -> Vec<TrailStep> {
        let mut reversed = Vec::new();
        let mut current = self;
        loop {
            reversed.push(TrailStep::Value(current.value.clone()));
            match &current.sources {
                Sources::None => break,
                Sources::One(source) => current = source,
                Sources::Many(sources) => {
                    reversed.push(TrailStep::Branches(sources.iter().map(|s| s.trail()).collect()));
                    break;
                }
            }
        }
        reversed.reverse();
        reversed
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key(), self.value)
    }
}

/// An entry in a node's input list: either a raw value or an existing record
#[derive(Debug, Clone)]
pub enum Input {
    Value(Value),
    Record(Arc<Record>),
}

impl Input {
    /// Raw values become zero-source external records.
    pub fn into_record(self) -> Arc<Record> {
        match self {
            Input::Value(value) => Record::external(value),
            Input::Record(record) => record,
        }
    }
}

impl From<Arc<Record>> for Input {
    fn from(record: Arc<Record>) -> Self {
        Input::Record(record)
    }
}

macro_rules! input_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Input {
                fn from(v: $ty) -> Self {
                    Input::Value(Value::from(v))
                }
            }
        )*
    };
}

input_from_value!(Value, i32, i64, f64, bool, &str, String);
