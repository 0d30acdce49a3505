use flowcore::{NodeId, NodeRef, Record};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    /// Completion order across all producers.
    order: Vec<Arc<Record>>,
    by_producer: HashMap<Option<NodeId>, Vec<Arc<Record>>>,
}

/// Default completion handler storage: final records keyed by producer.
///
/// Records whose producer is not a node (merge points, fork children) are
/// kept under the `None` key.
#[derive(Default)]
pub struct Aggregator {
    inner: Mutex<Inner>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: Arc<Record>) {
        let key = record.node().map(|n| n.id());
        let mut inner = self.inner.lock();
        inner.order.push(Arc::clone(&record));
        inner.by_producer.entry(key).or_default().push(record);
    }

    /// Every stored record in completion order.
    pub fn all(&self) -> Vec<Arc<Record>> {
        self.inner.lock().order.clone()
    }

    pub fn for_node(&self, node: &NodeRef) -> Vec<Arc<Record>> {
        self.inner
            .lock()
            .by_producer
            .get(&Some(node.id()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn take(&self) -> Vec<Arc<Record>> {
        let mut inner = self.inner.lock();
        inner.by_producer.clear();
        std::mem::take(&mut inner.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore::{Producer, Value};

    #[test]
    fn groups_by_producer_and_keeps_order() {
        let a = NodeRef::from_fn("a", |_, _| Ok(Value::Null));
        let b = NodeRef::from_fn("b", |_, _| Ok(Value::Null));
        let aggregator = Aggregator::new();
        aggregator.push(Record::new(Producer::Node(a.clone()), Value::from(1), Vec::new()));
        aggregator.push(Record::external(2));
        aggregator.push(Record::new(Producer::Node(a.clone()), Value::from(3), Vec::new()));

        assert_eq!(aggregator.len(), 3);
        assert_eq!(aggregator.for_node(&a).len(), 2);
        assert!(aggregator.for_node(&b).is_empty());

        let taken: Vec<Value> = aggregator.take().iter().map(|r| r.value().clone()).collect();
        assert_eq!(taken, vec![Value::from(1), Value::from(2), Value::from(3)]);
        assert!(aggregator.is_empty());
        assert!(aggregator.for_node(&a).is_empty());
    }
}
