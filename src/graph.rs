//! Dependency index and stream analysis.
//!
//! The index is a disposable snapshot of a [`TaskList`]: build it, query it,
//! drop it before mutating the list.

use crate::types::{Status, Task, TaskList};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Stream used when neither a task nor any ancestor names one.
pub const DEFAULT_STREAM: u32 = 1;

/// Lookup tables over one snapshot of a task list.
#[derive(Debug)]
pub struct DependencyIndex<'a> {
    by_stable: HashMap<&'a str, &'a Task>,
    by_hierarchical: HashMap<&'a str, &'a Task>,
    /// Stable ID -> stable IDs of the tasks it blocks.
    dependents: HashMap<&'a str, Vec<&'a str>>,
    /// Hierarchical ID -> effective stream.
    streams: HashMap<&'a str, u32>,
    /// Every task in pre-order.
    order: Vec<&'a Task>,
}

impl<'a> DependencyIndex<'a> {
    pub fn build(list: &'a TaskList) -> Self {
        let mut index = Self {
            by_stable: HashMap::new(),
            by_hierarchical: HashMap::new(),
            dependents: HashMap::new(),
            streams: HashMap::new(),
            order: Vec::new(),
        };
        for task in &list.tasks {
            index.add(task, DEFAULT_STREAM);
        }
        debug!(
            tasks = index.order.len(),
            stable = index.by_stable.len(),
            "built dependency index"
        );
        index
    }

    fn add(&mut self, task: &'a Task, inherited: u32) {
        let stream = if task.stream > 0 { task.stream } else { inherited };
        self.by_hierarchical.insert(&task.id, task);
        self.streams.insert(&task.id, stream);
        self.order.push(task);

        if let Some(stable_id) = task.stable_id.as_deref() {
            self.by_stable.insert(stable_id, task);
            for blocker in &task.blocked_by {
                self.dependents
                    .entry(blocker.as_str())
                    .or_default()
                    .push(stable_id);
            }
        }

        for child in &task.children {
            self.add(child, stream);
        }
    }

    pub fn get(&self, stable_id: &str) -> Option<&'a Task> {
        self.by_stable.get(stable_id).copied()
    }

    pub fn get_by_hierarchical(&self, id: &str) -> Option<&'a Task> {
        self.by_hierarchical.get(id).copied()
    }

    /// Stable IDs of tasks blocked by `stable_id`.
    pub fn dependents(&self, stable_id: &str) -> &[&'a str] {
        self.dependents
            .get(stable_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Own stream if set, else the nearest ancestor's, else 1.
    pub fn effective_stream(&self, id: &str) -> u32 {
        self.streams.get(id).copied().unwrap_or(DEFAULT_STREAM)
    }

    /// True if any blocker is not Completed. A blocker missing from the
    /// snapshot counts as incomplete.
    pub fn is_blocked(&self, task: &Task) -> bool {
        task.blocked_by.iter().any(|blocker| {
            self.get(blocker)
                .is_none_or(|t| t.status != Status::Completed)
        })
    }

    /// Pending, unclaimed and not blocked.
    pub fn is_ready(&self, task: &Task) -> bool {
        task.status == Status::Pending && !task.is_claimed() && !self.is_blocked(task)
    }

    /// Hierarchical IDs for the given stable IDs; unknown IDs are omitted.
    pub fn translate_to_hierarchical<S: AsRef<str>>(&self, stable_ids: &[S]) -> Vec<String> {
        stable_ids
            .iter()
            .filter_map(|s| self.get(s.as_ref()))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Path that adding "`from` blocked-by `to`" would close, if any.
    ///
    /// Walks blocked-by edges depth-first from `to`; reaching `from` means the
    /// new edge completes a cycle. The returned path starts and ends at
    /// `from`.
    pub fn detect_cycle(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if from == to {
            return Some(vec![from.to_string(), from.to_string()]);
        }

        let mut visited: HashSet<&str> = HashSet::from([to]);
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut stack: Vec<&str> = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                let mut chain = vec![current];
                let mut node = current;
                while node != to {
                    node = parent.get(node).copied()?;
                    chain.push(node);
                }
                chain.reverse();
                let mut path = vec![from.to_string()];
                path.extend(chain.into_iter().map(String::from));
                return Some(path);
            }

            let Some(task) = self.by_stable.get(current) else {
                continue;
            };
            for blocker in &task.blocked_by {
                let blocker = blocker.as_str();
                if visited.insert(blocker) {
                    parent.insert(blocker, current);
                    stack.push(blocker);
                }
            }
        }
        None
    }

    /// Every ready task in document pre-order, at any depth.
    pub fn ready(&self) -> Vec<&'a Task> {
        self.order
            .iter()
            .copied()
            .filter(|t| self.is_ready(t))
            .collect()
    }

    /// Keep only tasks whose effective stream is `stream`.
    pub fn filter_by_stream(&self, tasks: &[&'a Task], stream: u32) -> Vec<&'a Task> {
        tasks
            .iter()
            .copied()
            .filter(|t| self.effective_stream(&t.id) == stream)
            .collect()
    }

    /// Partition all non-completed tasks by effective stream.
    ///
    /// In-progress tasks are active; pending tasks with an incomplete blocker
    /// are blocked; pending, unblocked, unclaimed tasks are ready. Claimed
    /// pending tasks appear in no list.
    pub fn analyze_streams(&self) -> StreamsResult {
        let mut streams: BTreeMap<u32, StreamStatus> = BTreeMap::new();

        for task in &self.order {
            let id = self.effective_stream(&task.id);
            let stream = streams.entry(id).or_insert_with(|| StreamStatus::new(id));
            match task.status {
                Status::InProgress => stream.active.push(task.id.clone()),
                Status::Completed => {}
                Status::Pending if self.is_blocked(task) => stream.blocked.push(task.id.clone()),
                Status::Pending if task.is_claimed() => {}
                Status::Pending => stream.ready.push(task.id.clone()),
            }
        }

        let available = streams
            .values()
            .filter(|s| !s.ready.is_empty())
            .map(|s| s.id)
            .collect();

        StreamsResult {
            streams: streams.into_values().collect(),
            available,
        }
    }
}

/// Classification of one stream's tasks by hierarchical ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub id: u32,
    pub ready: Vec<String>,
    pub blocked: Vec<String>,
    pub active: Vec<String>,
}

impl StreamStatus {
    fn new(id: u32) -> Self {
        Self {
            id,
            ready: Vec::new(),
            blocked: Vec::new(),
            active: Vec::new(),
        }
    }
}

/// Stream partition, streams in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamsResult {
    pub streams: Vec<StreamStatus>,
    /// Streams with at least one ready task.
    pub available: Vec<u32>,
}

impl StreamsResult {
    pub fn stream(&self, id: u32) -> Option<&StreamStatus> {
        self.streams.iter().find(|s| s.id == id)
    }
}

/// Ready tasks of `list` in pre-order.
pub fn ready_tasks(list: &TaskList) -> Vec<&Task> {
    DependencyIndex::build(list).ready()
}

pub fn analyze_streams(list: &TaskList) -> StreamsResult {
    DependencyIndex::build(list).analyze_streams()
}

/// Would adding "`from` blocked-by `to`" (stable IDs) close a cycle?
pub fn would_create_cycle(list: &TaskList, from: &str, to: &str) -> Option<Vec<String>> {
    DependencyIndex::build(list).detect_cycle(from, to)
}
