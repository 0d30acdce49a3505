use crate::{FlowError, NodeRef, Record};
use std::sync::Arc;

/// The side of the orchestrator a join is allowed to touch.
pub trait Dispatcher {
    /// Hand `record` to `node`: inline when `inline` is set, otherwise by
    /// appending to the back of the queue.
    fn submit(&self, node: &NodeRef, record: Arc<Record>, inline: bool) -> Result<(), FlowError>;

    /// Default completion handler: store the record for later retrieval.
    fn complete(&self, record: Arc<Record>);
}

/// Routes a completed record to further nodes.
///
/// A join is attached to each of its source nodes with `NodeRef::set_join`
/// and invoked by the orchestrator once a source's call has produced a record.
pub trait Join: Send + Sync {
    /// Short variant name for logs ("sequence", "fork", ...)
    fn kind(&self) -> &str;

    fn on_complete(&self, dispatcher: &dyn Dispatcher, record: Arc<Record>) -> Result<(), FlowError>;
}
