//! Traversal and search over a task document.

use crate::error::{TaskError, TaskResult};
use crate::graph::DependencyIndex;
use crate::types::{Document, Status, Task, TaskList};
use serde::Serialize;

/// The next task with outstanding work, plus its incomplete descendants.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithContext<'a> {
    pub task: &'a Task,
    /// Children with incomplete work, each pruned the same way.
    pub incomplete_children: Vec<Task>,
}

impl TaskWithContext<'_> {
    /// Narrow the incomplete subtree to a single chain: the first incomplete
    /// child at each level.
    pub fn filter_to_first_path(&mut self) {
        keep_first(&mut self.incomplete_children);
    }

    /// Hierarchical IDs along the first incomplete path, starting at the task.
    pub fn path_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.task.id.as_str()];
        let mut level = &self.incomplete_children;
        while let Some(first) = level.first() {
            ids.push(&first.id);
            level = &first.children;
        }
        ids
    }
}

/// First top-level task, in document order, that is incomplete itself or has
/// an incomplete descendant.
pub fn find_next_incomplete(tasks: &[Task]) -> Option<TaskWithContext<'_>> {
    let task = tasks.iter().find(|t| t.has_incomplete_work())?;
    Some(TaskWithContext {
        task,
        incomplete_children: incomplete_subtree(&task.children),
    })
}

fn keep_first(tasks: &mut Vec<Task>) {
    tasks.truncate(1);
    if let Some(first) = tasks.first_mut() {
        keep_first(&mut first.children);
    }
}

fn incomplete_subtree(children: &[Task]) -> Vec<Task> {
    children
        .iter()
        .filter(|c| c.has_incomplete_work())
        .map(|c| Task {
            children: incomplete_subtree(&c.children),
            ..c.clone()
        })
        .collect()
}

/// Tasks selected from one phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTasks<'a> {
    pub phase_name: &'a str,
    pub tasks: Vec<&'a Task>,
}

/// First phase whose top-level run contains a Pending task at any depth.
///
/// Returns the phase's top-level tasks that still have incomplete work,
/// blocked or not. Tasks before the first heading belong to no phase. A
/// document without headings is treated as one unnamed phase.
pub fn find_next_phase_tasks(doc: &Document) -> Option<PhaseTasks<'_>> {
    if !doc.has_phases() {
        return pending_run("", &doc.list.tasks);
    }
    doc.phase_ranges()
        .into_iter()
        .find_map(|range| pending_run(range.name, &doc.list.tasks[range.start..range.end]))
}

fn pending_run<'a>(phase_name: &'a str, run: &'a [Task]) -> Option<PhaseTasks<'a>> {
    let has_pending = run
        .iter()
        .flat_map(Task::walk)
        .any(|t| t.status == Status::Pending);
    has_pending.then(|| PhaseTasks {
        phase_name,
        tasks: run.iter().filter(|t| t.has_incomplete_work()).collect(),
    })
}

/// Every top-level task under the first heading called `name`.
pub fn phase_tasks<'a>(doc: &'a Document, name: &str) -> TaskResult<PhaseTasks<'a>> {
    let range = doc
        .phase_ranges()
        .into_iter()
        .find(|r| r.name == name)
        .ok_or_else(|| TaskError::PhaseNotFound(name.to_string()))?;
    Ok(PhaseTasks {
        phase_name: range.name,
        tasks: doc.list.tasks[range.start..range.end].iter().collect(),
    })
}

/// First phase with a ready top-level task in `stream`.
///
/// Returns that phase's non-completed top-level tasks in `stream`, including
/// claimed, in-progress and blocked ones.
pub fn find_next_phase_tasks_for_stream(
    doc: &Document,
    stream: u32,
) -> TaskResult<Option<PhaseTasks<'_>>> {
    if stream == 0 {
        return Err(TaskError::InvalidStream);
    }
    let index = DependencyIndex::build(&doc.list);

    Ok(doc.phase_ranges().into_iter().find_map(|range| {
        let in_stream: Vec<&Task> = doc.list.tasks[range.start..range.end]
            .iter()
            .filter(|t| index.effective_stream(&t.id) == stream)
            .collect();
        in_stream
            .iter()
            .any(|t| index.is_ready(t))
            .then(|| PhaseTasks {
                phase_name: range.name,
                tasks: in_stream
                    .into_iter()
                    .filter(|t| t.status != Status::Completed)
                    .collect(),
            })
    }))
}

/// Options for [`TaskList::find`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub case_sensitive: bool,
    pub search_details: bool,
    pub search_references: bool,
    pub status: Option<Status>,
    /// Deepest level to include; 0 means unlimited.
    pub max_depth: usize,
    /// Exact parent ID; `Some("")` selects top-level tasks.
    pub parent_id: Option<String>,
}

/// Criteria for [`TaskList::filter`]. All set criteria must hold.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub status: Option<Status>,
    /// 0 means unlimited.
    pub max_depth: usize,
    /// `Some("")` selects top-level tasks.
    pub parent_id: Option<String>,
    /// Case-insensitive title substring.
    pub title_pattern: Option<String>,
}

fn structural_match(
    task: &Task,
    status: Option<Status>,
    max_depth: usize,
    parent_id: Option<&str>,
) -> bool {
    status.is_none_or(|s| task.status == s)
        && (max_depth == 0 || task.level() <= max_depth)
        && parent_id.is_none_or(|p| task.parent_id().unwrap_or("") == p)
}

impl TaskList {
    /// Substring search over titles, and optionally details and references.
    /// Matches are returned in pre-order.
    pub fn find(&self, pattern: &str, opts: &QueryOptions) -> Vec<&Task> {
        let fold = |s: &str| {
            if opts.case_sensitive {
                s.to_string()
            } else {
                s.to_lowercase()
            }
        };
        let needle = fold(pattern);
        let hit = |s: &String| fold(s).contains(&needle);

        self.walk()
            .filter(|t| {
                structural_match(t, opts.status, opts.max_depth, opts.parent_id.as_deref())
            })
            .filter(|t| {
                hit(&t.title)
                    || (opts.search_details && t.details.iter().any(hit))
                    || (opts.search_references && t.references.iter().any(hit))
            })
            .collect()
    }

    pub fn filter(&self, filter: &QueryFilter) -> Vec<&Task> {
        let pattern = filter.title_pattern.as_deref().map(str::to_lowercase);
        self.walk()
            .filter(|t| {
                structural_match(
                    t,
                    filter.status,
                    filter.max_depth,
                    filter.parent_id.as_deref(),
                )
            })
            .filter(|t| {
                pattern
                    .as_deref()
                    .is_none_or(|p| t.title.to_lowercase().contains(p))
            })
            .collect()
    }
}
