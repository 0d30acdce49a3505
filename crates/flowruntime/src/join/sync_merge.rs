use super::deliver;
use flowcore::{Dispatcher, FlowError, Join, JoinConfig, NodeRef, Record};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

type Grid = Vec<Vec<Option<Arc<Record>>>>;

/// Many sources, one target, behind a barrier.
///
/// Each source is a row of one or more variant nodes; the slot grid holds
/// one cell per (row, variant). The target is only dispatched once every
/// cell is filled, with one merged record per combination that picks one
/// record from each row. The grid is then cleared for the next group.
pub struct SyncMerge {
    rows: Vec<Vec<NodeRef>>,
    target: NodeRef,
    config: JoinConfig,
    grid: Mutex<Grid>,
}

impl SyncMerge {
    /// One row per source node.
    pub fn connect(sources: &[NodeRef], target: &NodeRef, config: JoinConfig) -> Arc<Self> {
        Self::connect_batched(sources.iter().map(|s| vec![s.clone()]).collect(), target, config)
    }

    /// Rows of variant nodes; the row width is the source's batch width.
    pub fn connect_batched(rows: Vec<Vec<NodeRef>>, target: &NodeRef, config: JoinConfig) -> Arc<Self> {
        let grid = rows.iter().map(|row| vec![None; row.len()]).collect();
        let join = Arc::new(Self {
            rows,
            target: target.clone(),
            config,
            grid: Mutex::new(grid),
        });
        for node in join.rows.iter().flatten() {
            node.set_join(join.clone());
        }
        join
    }

    /// Number of cells still waiting for a result.
    pub fn pending(&self) -> usize {
        self.grid.lock().iter().flatten().filter(|cell| cell.is_none()).count()
    }

    fn locate(&self, producer: &NodeRef) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(row, nodes)| {
            nodes
                .iter()
                .position(|n| n == producer)
                .map(|column| (row, column))
        })
    }

    /// Place `record` and, if that completes the grid, take the whole group
    /// out and leave the grid empty.
    fn fill(&self, row: usize, column: usize, producer: &NodeRef, record: Arc<Record>) -> Result<Option<Vec<Vec<Arc<Record>>>>, FlowError> {
        let mut grid = self.grid.lock();
        let cell = &mut grid[row][column];
        if cell.is_some() {
            return Err(FlowError::SlotCollision {
                row,
                column,
                node: producer.name().to_string(),
            });
        }
        *cell = Some(record);

        if grid.iter().flatten().any(Option::is_none) {
            return Ok(None);
        }
        let group: Vec<Vec<Arc<Record>>> = grid
            .iter_mut()
            .map(|cells| cells.iter_mut().filter_map(Option::take).collect::<Vec<_>>())
            .collect();
        Ok(Some(group))
    }
}

/// Every combination that picks one record per row; the first row varies
/// slowest.
fn cross_product(rows: &[Vec<Arc<Record>>]) -> Vec<Vec<Arc<Record>>> {
    let seed: Vec<Vec<Arc<Record>>> = vec![Vec::new()];
    rows.iter().fold(seed, |combinations, row| {
        combinations
            .iter()
            .flat_map(|prefix| {
                row.iter().map(move |record| {
                    let mut combination = prefix.clone();
                    combination.push(Arc::clone(record));
                    combination
                })
            })
            .collect()
    })
}

impl Join for SyncMerge {
    fn kind(&self) -> &str {
        "sync_merge"
    }

    fn on_complete(&self, dispatcher: &dyn Dispatcher, record: Arc<Record>) -> Result<(), FlowError> {
        let unknown = || FlowError::UnknownSource { node: record.key() };
        let producer = record.node().cloned().ok_or_else(unknown)?;
        let (row, column) = self.locate(&producer).ok_or_else(unknown)?;

        let Some(group) = self.fill(row, column, &producer, Arc::clone(&record))? else {
            debug!(source = %producer, row, column, pending = self.pending(), "waiting for group");
            return Ok(());
        };

        let combinations = cross_product(&group);
        debug!(to = %self.target, combinations = combinations.len(), "group complete");
        for combination in combinations {
            deliver(dispatcher, &self.config, &self.target, Record::merge(combination))?;
        }
        Ok(())
    }
}
