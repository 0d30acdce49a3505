use super::deliver;
use flowcore::{Dispatcher, FlowError, Join, JoinConfig, NodeRef, Record};
use std::sync::Arc;

/// One source, one target: forwards the record unchanged.
pub struct Sequence {
    target: NodeRef,
    config: JoinConfig,
}

impl Sequence {
    pub fn connect(source: &NodeRef, target: &NodeRef, config: JoinConfig) -> Arc<Self> {
        let join = Arc::new(Self {
            target: target.clone(),
            config,
        });
        source.set_join(join.clone());
        join
    }
}

impl Join for Sequence {
    fn kind(&self) -> &str {
        "sequence"
    }

    fn on_complete(&self, dispatcher: &dyn Dispatcher, record: Arc<Record>) -> Result<(), FlowError> {
        deliver(dispatcher, &self.config, &self.target, record)
    }
}
