use super::deliver;
use flowcore::{Dispatcher, FlowError, Join, JoinConfig, NodeRef, Record};
use std::sync::Arc;

/// One source, many targets: an independent dispatch per target, in
/// target order.
pub struct Fork {
    targets: Vec<NodeRef>,
    config: JoinConfig,
}

impl Fork {
    pub fn connect(source: &NodeRef, targets: &[NodeRef], config: JoinConfig) -> Arc<Self> {
        let join = Arc::new(Self {
            targets: targets.to_vec(),
            config,
        });
        source.set_join(join.clone());
        join
    }

    pub fn targets(&self) -> &[NodeRef] {
        &self.targets
    }
}

impl Join for Fork {
    fn kind(&self) -> &str {
        "fork"
    }

    fn on_complete(&self, dispatcher: &dyn Dispatcher, record: Arc<Record>) -> Result<(), FlowError> {
        for target in &self.targets {
            deliver(dispatcher, &self.config, target, Arc::clone(&record))?;
        }
        Ok(())
    }
}
