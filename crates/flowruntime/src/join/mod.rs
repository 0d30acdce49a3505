//! Join variants that route a completed record to further nodes.
//!
//! Every constructor attaches the join to its source nodes and returns it.
//! The per-join `JoinConfig` transform (iterate, wrap) runs before each
//! dispatch, and `synchronous_defer` selects inline dispatch over queueing.

mod fork;
mod merge;
mod sequence;
mod switch;
mod sync_merge;

pub use fork::Fork;
pub use merge::Merge;
pub use sequence::Sequence;
pub use switch::{Decision, Switch};
pub use sync_merge::SyncMerge;

use flowcore::{Dispatcher, FlowError, JoinConfig, NodeRef, Record};
use std::sync::Arc;
use tracing::debug;

/// Apply the configured transform and submit every resulting record.
fn deliver(
    dispatcher: &dyn Dispatcher,
    config: &JoinConfig,
    target: &NodeRef,
    record: Arc<Record>,
) -> Result<(), FlowError> {
    for prepared in config.prepare(record) {
        debug!(to = %target, inline = config.synchronous_defer, "join dispatch");
        dispatcher.submit(target, prepared, config.synchronous_defer)?;
    }
    Ok(())
}

/// Producer of `record`, required to be one of `sources`.
fn source_of<'a>(record: &Record, sources: &'a [NodeRef]) -> Result<&'a NodeRef, FlowError> {
    record
        .node()
        .and_then(|producer| sources.iter().find(|s| *s == producer))
        .ok_or_else(|| FlowError::UnknownSource { node: record.key() })
}
