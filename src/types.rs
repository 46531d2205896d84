//! Core types for the task document model.

use crate::config::Config;
use crate::ids;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use std::collections::HashSet;

/// Default link target for requirement references.
pub const DEFAULT_REQUIREMENTS_FILE: &str = "requirements.md";

/// Task status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "StatusRepr")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl Status {
    /// Checkbox glyph written on a task line.
    pub fn marker(self) -> &'static str {
        match self {
            Status::Pending => "[ ]",
            Status::InProgress => "[-]",
            Status::Completed => "[x]",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "[ ]" => Some(Status::Pending),
            "[-]" => Some(Status::InProgress),
            "[x]" | "[X]" => Some(Status::Completed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" | "Pending" | "0" => Ok(Status::Pending),
            "in_progress" | "in-progress" | "inprogress" | "InProgress" | "1" => {
                Ok(Status::InProgress)
            }
            "completed" | "Completed" | "2" => Ok(Status::Completed),
            other => Err(format!(
                "invalid status: {other} (must be pending, in_progress or completed)"
            )),
        }
    }
}

/// Wire forms accepted for a status: a name or the numeric code 0-2.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<StatusRepr> for Status {
    type Error = String;

    fn try_from(repr: StatusRepr) -> Result<Self, Self::Error> {
        match repr {
            StatusRepr::Code(0) => Ok(Status::Pending),
            StatusRepr::Code(1) => Ok(Status::InProgress),
            StatusRepr::Code(2) => Ok(Status::Completed),
            StatusRepr::Code(n) => Err(format!("invalid status value: {n} (must be 0-2)")),
            StatusRepr::Name(name) => name.parse(),
        }
    }
}

/// A task and its exclusively owned subtree.
///
/// `id` is the hierarchical position ("1.2.3"). It is recomputed by
/// [`TaskList::renumber`] after every structural change and is never an
/// independent piece of state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    pub title: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    /// Explicit stream; 0 means inherit.
    #[serde(skip_serializing_if = "is_zero")]
    pub stream: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Stable IDs of blocking tasks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Task>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Hierarchical ID of the parent, `None` for top-level tasks.
    pub fn parent_id(&self) -> Option<&str> {
        ids::parent_id(&self.id)
    }

    /// Nesting level, 1 for top-level tasks.
    pub fn level(&self) -> usize {
        ids::level(&self.id)
    }

    pub fn is_claimed(&self) -> bool {
        self.owner.is_some()
    }

    /// True if this task or any descendant is not Completed.
    pub fn has_incomplete_work(&self) -> bool {
        self.walk().any(|t| t.status != Status::Completed)
    }

    /// Pre-order traversal of this task and its descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    fn renumber_children(&mut self) {
        for (i, child) in self.children.iter_mut().enumerate() {
            child.id = ids::child_id(&self.id, i + 1);
            child.renumber_children();
        }
    }
}

/// Pre-order iterator over a task forest.
pub struct Walk<'a> {
    stack: Vec<&'a Task>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Task;

    fn next(&mut self) -> Option<Self::Item> {
        let task = self.stack.pop()?;
        self.stack.extend(task.children.iter().rev());
        Some(task)
    }
}

/// Document-level preamble: references and flat metadata.
///
/// Metadata keeps insertion order so a parse/render cycle does not reorder keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrontMatter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_ordered_map"
    )]
    pub metadata: Vec<(String, String)>,
}

fn serialize_ordered_map<S: Serializer>(
    entries: &[(String, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

impl FrontMatter {
    pub fn is_empty(&self) -> bool {
        self.references.is_empty() && self.metadata.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a metadata value, keeping the key's original slot.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.metadata.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.metadata.push((key, value)),
        }
    }
}

/// Root of a task document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskList {
    pub title: String,
    #[serde(skip_serializing_if = "FrontMatter::is_empty")]
    pub front_matter: FrontMatter,
    pub tasks: Vec<Task>,
    pub requirements_file: String,
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new("")
    }
}

impl TaskList {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into().trim().to_string(),
            front_matter: FrontMatter::default(),
            tasks: Vec::new(),
            requirements_file: DEFAULT_REQUIREMENTS_FILE.to_string(),
        }
    }

    /// Pre-order traversal of every task in the document.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.tasks.iter().rev().collect(),
        }
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        let path = ids::index_path(id)?;
        self.task_at_path(&path)
    }

    pub fn find_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        let path = ids::index_path(id)?;
        self.task_at_path_mut(&path)
    }

    pub(crate) fn task_at_path(&self, path: &[usize]) -> Option<&Task> {
        let (first, rest) = path.split_first()?;
        let mut task = self.tasks.get(*first)?;
        for &i in rest {
            task = task.children.get(i)?;
        }
        Some(task)
    }

    pub(crate) fn task_at_path_mut(&mut self, path: &[usize]) -> Option<&mut Task> {
        let (first, rest) = path.split_first()?;
        let mut task = self.tasks.get_mut(*first)?;
        for &i in rest {
            task = task.children.get_mut(i)?;
        }
        Some(task)
    }

    pub fn find_by_stable_id(&self, stable_id: &str) -> Option<&Task> {
        self.walk()
            .find(|t| t.stable_id.as_deref() == Some(stable_id))
    }

    /// Recompute every hierarchical ID from tree position.
    pub fn renumber(&mut self) {
        for (i, task) in self.tasks.iter_mut().enumerate() {
            task.id = (i + 1).to_string();
            task.renumber_children();
        }
    }

    /// Total number of tasks at every depth.
    pub fn count(&self) -> usize {
        self.walk().count()
    }

    pub fn stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    pub fn stable_ids(&self) -> impl Iterator<Item = &str> {
        self.walk().filter_map(|t| t.stable_id.as_deref())
    }
}

/// Task counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl Stats {
    /// Counts over the given subtrees. A task reachable from more than one
    /// of them is counted once.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut seen = HashSet::new();
        let mut stats = Stats::default();
        for task in tasks.into_iter().flat_map(Task::walk) {
            if !seen.insert(task.id.as_str()) {
                continue;
            }
            stats.total += 1;
            match task.status {
                Status::Pending => stats.pending += 1,
                Status::InProgress => stats.in_progress += 1,
                Status::Completed => stats.completed += 1,
            }
        }
        stats
    }

    pub fn completion_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// A phase heading and the number of top-level tasks that precede it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseMarker {
    pub name: String,
    pub position: usize,
}

impl PhaseMarker {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }

    /// Hierarchical ID of the top-level task preceding the heading, empty at
    /// the start of the document.
    pub fn after_task_id(&self) -> String {
        if self.position == 0 {
            String::new()
        } else {
            self.position.to_string()
        }
    }
}

/// Contiguous run of top-level tasks belonging to one phase heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRange<'a> {
    pub name: &'a str,
    /// Index into `phases`.
    pub marker: usize,
    pub start: usize,
    pub end: usize,
}

/// A task list together with its phase headings.
///
/// This is the unit the mutation engine keeps consistent: phase positions
/// shift with top-level inserts and removes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    #[serde(flatten)]
    pub list: TaskList,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<PhaseMarker>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            list: TaskList::new(title),
            phases: Vec::new(),
        }
    }

    /// An empty document linking requirements to the configured file.
    pub fn with_config(title: impl Into<String>, config: &Config) -> Self {
        let mut doc = Self::new(title);
        doc.list.requirements_file = config.files.requirements_file.clone();
        doc
    }

    pub fn from_parts(list: TaskList, phases: Vec<PhaseMarker>) -> Self {
        Self { list, phases }
    }

    pub fn has_phases(&self) -> bool {
        !self.phases.is_empty()
    }

    /// Top-level index ranges covered by each phase, in document order.
    pub fn phase_ranges(&self) -> Vec<PhaseRange<'_>> {
        let len = self.list.tasks.len();
        self.phases
            .iter()
            .enumerate()
            .map(|(i, marker)| {
                let start = marker.position.min(len);
                let end = self
                    .phases
                    .get(i + 1)
                    .map_or(len, |next| next.position.min(len));
                PhaseRange {
                    name: &marker.name,
                    marker: i,
                    start,
                    end: end.max(start),
                }
            })
            .collect()
    }

    /// Name of the phase containing the top-level task at `index`.
    pub fn phase_of(&self, index: usize) -> Option<&str> {
        self.phase_ranges()
            .into_iter()
            .rev()
            .find(|r| r.start <= index && index < r.end)
            .map(|r| r.name)
    }

    pub fn find_phase(&self, name: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.name == name)
    }
}
