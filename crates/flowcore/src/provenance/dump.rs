//! ASCII rendering of a provenance DAG.
//!
//! Records are laid out in source-first topological order, each branch
//! printed to its end before the next sibling. A chain of single-source
//! records prints as one vertical run at the same depth.
//! A record feeding several records in the dump opens a fork: its branches
//! start with `|- ` and the last one with `` `- ``, one level deeper. A merge
//! point prints a converging leader with one `` ` `` per source and returns
//! one level up.
//!
//! ```text
//! <input>: [1, 2]
//! |- [0]: 1
//! |  inc: 2
//! `- [1]: 2
//!    inc: 3
//! `-`> <merge>: [2, 3]
//! ```

use super::Record;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

/// Reachable records with their in-dump edges.
struct Layout<'a> {
    order: Vec<&'a Record>,
    sources: Vec<Vec<usize>>,
    descendants: Vec<Vec<usize>>,
}

fn ptr(record: &Record) -> *const Record {
    record as *const Record
}

impl<'a> Layout<'a> {
    fn collect(targets: &'a [Arc<Record>]) -> Self {
        let mut visited: HashSet<*const Record> = HashSet::new();
        let mut index: HashMap<*const Record, usize> = HashMap::new();
        let mut order: Vec<&'a Record> = Vec::new();

        // Iterative post-order DFS over sources; each record is emitted
        // after all of its sources and exactly once.
        for target in targets {
            let target: &'a Record = target;
            if !visited.insert(ptr(target)) {
                continue;
            }
            let mut stack: Vec<(&'a Record, usize)> = vec![(target, 0)];
            while let Some((record, next)) = stack.last_mut() {
                let record: &'a Record = *record;
                if let Some(source) = record.sources().get(*next) {
                    *next += 1;
                    let source: &'a Record = source;
                    if visited.insert(ptr(source)) {
                        stack.push((source, 0));
                    }
                } else {
                    stack.pop();
                    index.insert(ptr(record), order.len());
                    order.push(record);
                }
            }
        }

        let mut sources = Vec::with_capacity(order.len());
        let mut descendants: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
        for (i, record) in order.iter().enumerate() {
            let ids: Vec<usize> = record
                .sources()
                .iter()
                .filter_map(|s| index.get(&ptr(s)).copied())
                .collect();
            for &s in &ids {
                if descendants[s].last() != Some(&i) {
                    descendants[s].push(i);
                }
            }
            sources.push(ids);
        }

        Self {
            order,
            sources,
            descendants,
        }
        .branch_first()
    }

    /// Reorder so that each branch is printed to its end before the next
    /// sibling branch starts. A record is emitted once all of its sources
    /// are; the first ready descendant is followed immediately.
    fn branch_first(self) -> Self {
        let n = self.order.len();
        // Distinct in-dump sources still to be emitted, per record.
        let mut waiting = vec![0usize; n];
        for &d in self.descendants.iter().flatten() {
            waiting[d] += 1;
        }
        let mut stack: Vec<usize> = (0..n).rev().filter(|&i| waiting[i] == 0).collect();
        let mut emitted = Vec::with_capacity(n);

        while let Some(i) = stack.pop() {
            emitted.push(i);
            for &d in self.descendants[i].iter().rev() {
                waiting[d] -= 1;
                if waiting[d] == 0 {
                    stack.push(d);
                }
            }
        }

        let mut position = vec![0usize; n];
        for (pos, &i) in emitted.iter().enumerate() {
            position[i] = pos;
        }
        let remap = |ids: &[usize]| -> Vec<usize> { ids.iter().map(|&i| position[i]).collect() };

        Self {
            order: emitted.iter().map(|&i| self.order[i]).collect(),
            sources: emitted.iter().map(|&i| remap(&self.sources[i])).collect(),
            descendants: emitted.iter().map(|&i| remap(&self.descendants[i])).collect(),
        }
    }

    fn render(&self) -> Vec<String> {
        let n = self.order.len();
        let mut depth = vec![0usize; n];
        let mut branches_seen = vec![0usize; n];
        // open[level] is set while the fork that opened `level` still has
        // branches to print; index 0 is unused.
        let mut open: Vec<bool> = vec![false];
        let mut lines = Vec::with_capacity(n);

        for i in 0..n {
            let label = self.order[i].to_string();
            match self.sources[i].as_slice() {
                [] => {
                    depth[i] = 0;
                    lines.push(label);
                }
                [s] => {
                    let s = *s;
                    let fan_out = self.descendants[s].len();
                    if fan_out > 1 {
                        branches_seen[s] += 1;
                        let last = branches_seen[s] >= fan_out;
                        let level = depth[s] + 1;
                        let leader = if last { "`- " } else { "|- " };
                        lines.push(format!("{}{}{}", prefix(&open, depth[s]), leader, label));
                        open.truncate(level);
                        open.resize(level + 1, false);
                        open[level] = !last;
                        depth[i] = level;
                    } else {
                        depth[i] = depth[s];
                        lines.push(format!("{}{}", prefix(&open, depth[i]), label));
                    }
                }
                many => {
                    for &s in many {
                        if self.descendants[s].len() > 1 {
                            branches_seen[s] += 1;
                        }
                    }
                    let level = many
                        .iter()
                        .map(|&s| depth[s])
                        .min()
                        .unwrap_or(0)
                        .saturating_sub(1);
                    let leader = vec!["`"; many.len()].join("-");
                    lines.push(format!("{}{}> {}", prefix(&open, level), leader, label));
                    open.truncate(level + 1);
                    depth[i] = level;
                }
            }
        }

        lines
    }
}

fn prefix(open: &[bool], depth: usize) -> String {
    (1..=depth)
        .map(|level| if open.get(level).copied().unwrap_or(false) { "|  " } else { "   " })
        .collect()
}

/// Write the trail diagram of everything reachable from `records`.
pub fn dump<W: io::Write>(target: &mut W, records: &[Arc<Record>]) -> io::Result<()> {
    for line in Layout::collect(records).render() {
        writeln!(target, "{}", line)?;
    }
    Ok(())
}

/// Render the trail diagram into a string, one line per record.
pub fn dump_string(records: &[Arc<Record>]) -> String {
    let mut out = String::new();
    for line in Layout::collect(records).render() {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Producer, Value};

    #[test]
    fn shared_source_is_emitted_once() {
        let root = Record::external(1);
        let a = Record::new(Producer::Index(0), Value::from(2), vec![root.clone()]);
        let b = Record::new(Producer::Index(1), Value::from(3), vec![root.clone()]);
        let records = [a, b];
        let layout = Layout::collect(&records);
        assert_eq!(layout.order.len(), 3);
        assert_eq!(layout.descendants[0], vec![1, 2]);
    }
}
