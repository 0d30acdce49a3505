use super::deliver;
use flowcore::{Dispatcher, FlowError, Join, JoinConfig, NodeRef, Record};
use std::sync::Arc;
use tracing::debug;

/// Picks a target index for a completed record; `None` means "no route".
pub type Decision = Arc<dyn Fn(&Record) -> Option<usize> + Send + Sync>;

/// One source, one of many targets chosen per record.
///
/// Records the decision does not route go to the default completion
/// handler. An index without a target is a configuration error.
pub struct Switch {
    targets: Vec<NodeRef>,
    decide: Decision,
    config: JoinConfig,
}

impl Switch {
    pub fn connect<F>(source: &NodeRef, targets: &[NodeRef], decide: F, config: JoinConfig) -> Arc<Self>
    where
        F: Fn(&Record) -> Option<usize> + Send + Sync + 'static,
    {
        let join = Arc::new(Self {
            targets: targets.to_vec(),
            decide: Arc::new(decide),
            config,
        });
        source.set_join(join.clone());
        join
    }
}

impl Join for Switch {
    fn kind(&self) -> &str {
        "switch"
    }

    fn on_complete(&self, dispatcher: &dyn Dispatcher, record: Arc<Record>) -> Result<(), FlowError> {
        let Some(index) = (self.decide)(&record) else {
            debug!(record = %record, "switch declined; storing result");
            dispatcher.complete(record);
            return Ok(());
        };
        let target = self.targets.get(index).ok_or(FlowError::UnmappedSwitch {
            index,
            targets: self.targets.len(),
        })?;
        deliver(dispatcher, &self.config, target, record)
    }
}
