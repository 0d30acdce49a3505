use flowcore::{FlowError, NodeId, NodeRef, Record};
use parking_lot::Mutex;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Callback that performs the actual call of a dependency, given the
/// records of its own already-resolved dependencies.
pub type Invoke<'a> = dyn Fn(&NodeRef, Vec<Arc<Record>>) -> Result<Arc<Record>, FlowError> + 'a;

struct Entry {
    node: NodeRef,
    result: Option<Arc<Record>>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<NodeId, Entry>,
    /// Nodes currently being resolved, outermost first.
    stack: Vec<NodeRef>,
}

/// Memoizes one-time resolution of nodes used as dependencies.
///
/// Resolution is depth-first, dependencies before dependents and left to
/// right among siblings. A node that is reached again while it is still on
/// the resolution stack fails with `FlowError::CircularDependency`.
#[derive(Default)]
pub struct DependencyRegistry {
    inner: Mutex<Inner>,
}

/// Pops the resolution stack back to its depth on entry, on success or error.
struct Frame<'a> {
    registry: &'a DependencyRegistry,
    depth: usize,
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.registry.inner.lock().stack.truncate(self.depth);
    }
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `node` once and return its memoized record.
    pub fn resolve(&self, node: &NodeRef, invoke: &Invoke<'_>) -> Result<Arc<Record>, FlowError> {
        if let Some(record) = self.cached(node) {
            trace!(node = %node, "dependency already resolved");
            return Ok(record);
        }

        let _frame = self.enter(node)?;
        let dependencies = self.resolve_all(&node.dependencies(), invoke)?;
        let record = invoke(node, dependencies)?;
        self.memoize(node, Arc::clone(&record));
        debug!(node = %node, "resolved dependency");
        Ok(record)
    }

    /// Resolve every dependency of `node` (but not `node` itself), with
    /// `node` on the stack so a dependency reaching back to it is caught.
    pub fn resolve_dependencies(&self, node: &NodeRef, invoke: &Invoke<'_>) -> Result<Vec<Arc<Record>>, FlowError> {
        let dependencies = node.dependencies();
        if dependencies.is_empty() {
            return Ok(Vec::new());
        }
        let _frame = self.enter(node)?;
        self.resolve_all(&dependencies, invoke)
    }

    fn resolve_all(&self, dependencies: &[NodeRef], invoke: &Invoke<'_>) -> Result<Vec<Arc<Record>>, FlowError> {
        dependencies.iter().map(|d| self.resolve(d, invoke)).collect()
    }

    fn enter(&self, node: &NodeRef) -> Result<Frame<'_>, FlowError> {
        let mut inner = self.inner.lock();
        if inner.stack.contains(node) {
            let mut trace: Vec<String> = inner.stack.iter().map(|n| n.name().to_string()).collect();
            trace.push(node.name().to_string());
            return Err(FlowError::CircularDependency { trace });
        }
        inner.stack.push(node.clone());
        Ok(Frame {
            registry: self,
            depth: inner.stack.len() - 1,
        })
    }

    fn cached(&self, node: &NodeRef) -> Option<Arc<Record>> {
        self.inner
            .lock()
            .entries
            .get(&node.id())
            .and_then(|e| e.result.clone())
    }

    fn memoize(&self, node: &NodeRef, record: Arc<Record>) {
        self.inner.lock().entries.insert(
            node.id(),
            Entry {
                node: node.clone(),
                result: Some(record),
            },
        );
    }

    pub fn is_resolved(&self, node: &NodeRef) -> bool {
        self.cached(node).is_some()
    }

    /// Clear the memoized result so the next resolve calls the node again.
    /// With `recursive`, every transitive dependency is cleared too.
    pub fn reset(&self, node: &NodeRef, recursive: bool) {
        let mut pending = vec![node.clone()];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.id()) {
                continue;
            }
            if let Some(entry) = self.inner.lock().entries.get_mut(&current.id()) {
                entry.result = None;
            }
            if recursive {
                pending.extend(current.dependencies());
            }
        }
    }

    pub fn reset_all(&self) {
        for entry in self.inner.lock().entries.values_mut() {
            entry.result = None;
        }
    }

    /// Nodes that have been resolved at least once since the last reset.
    pub fn resolved(&self) -> Vec<NodeRef> {
        self.inner
            .lock()
            .entries
            .values()
            .filter(|e| e.result.is_some())
            .map(|e| e.node.clone())
            .collect()
    }

    /// Check the dependency graph reachable from `roots` for cycles without
    /// calling any node.
    pub fn check_acyclic(roots: &[NodeRef]) -> Result<(), FlowError> {
        let mut graph: DiGraph<NodeRef, ()> = DiGraph::new();
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();
        let mut pending: Vec<NodeRef> = roots.to_vec();

        while let Some(node) = pending.pop() {
            if index.contains_key(&node.id()) {
                continue;
            }
            index.insert(node.id(), graph.add_node(node.clone()));
            pending.extend(node.dependencies());
        }

        for idx in graph.node_indices().collect::<Vec<_>>() {
            for dependency in graph[idx].dependencies() {
                if let Some(&dep_idx) = index.get(&dependency.id()) {
                    graph.add_edge(idx, dep_idx, ());
                }
            }
        }

        for component in tarjan_scc(&graph) {
            let cyclic = component.len() > 1
                || graph.contains_edge(component[0], component[0]);
            if cyclic {
                let mut trace: Vec<String> = component.iter().map(|&i| graph[i].name().to_string()).collect();
                trace.push(trace[0].clone());
                return Err(FlowError::CircularDependency { trace });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore::{Producer, Value};

    fn leaf(name: &str) -> NodeRef {
        NodeRef::from_fn(name, |_, _| Ok(Value::Null))
    }

    fn invoke(node: &NodeRef, deps: Vec<Arc<Record>>) -> Result<Arc<Record>, FlowError> {
        Ok(Record::new(Producer::Node(node.clone()), Value::Null, deps))
    }

    #[test]
    fn stack_is_empty_after_failure() {
        let a = leaf("a");
        let b = leaf("b").with_dependencies([a.clone()]);
        a.add_dependency(&b);

        let registry = DependencyRegistry::new();
        assert!(registry.resolve(&b, &invoke).is_err());
        assert!(registry.inner.lock().stack.is_empty());
    }

    #[test]
    fn check_acyclic_accepts_diamond() {
        let base = leaf("base");
        let left = leaf("left").with_dependencies([base.clone()]);
        let right = leaf("right").with_dependencies([base]);
        let top = leaf("top").with_dependencies([left, right]);
        assert!(DependencyRegistry::check_acyclic(&[top]).is_ok());
    }

    #[test]
    fn check_acyclic_reports_self_loop() {
        let a = leaf("a");
        a.add_dependency(&a);
        match DependencyRegistry::check_acyclic(&[a]) {
            Err(FlowError::CircularDependency { trace }) => assert_eq!(trace, vec!["a", "a"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }
}
