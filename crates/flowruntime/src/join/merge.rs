use super::{deliver, source_of};
use flowcore::{Dispatcher, FlowError, Join, JoinConfig, NodeRef, Record};
use std::sync::Arc;

/// Many sources, one target, unsynchronized: every source completion is
/// dispatched on its own with no pairing across sources.
pub struct Merge {
    sources: Vec<NodeRef>,
    target: NodeRef,
    config: JoinConfig,
}

impl Merge {
    pub fn connect(sources: &[NodeRef], target: &NodeRef, config: JoinConfig) -> Arc<Self> {
        let join = Arc::new(Self {
            sources: sources.to_vec(),
            target: target.clone(),
            config,
        });
        for source in sources {
            source.set_join(join.clone());
        }
        join
    }
}

impl Join for Merge {
    fn kind(&self) -> &str {
        "merge"
    }

    fn on_complete(&self, dispatcher: &dyn Dispatcher, record: Arc<Record>) -> Result<(), FlowError> {
        source_of(&record, &self.sources)?;
        deliver(dispatcher, &self.config, &self.target, record)
    }
}
