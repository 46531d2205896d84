//! Output projections of a document: markdown or JSON.

use crate::error::{TaskError, TaskResult};
use crate::render;
use crate::types::{Document, FrontMatter, PhaseMarker, Stats, Task};
use serde::Serialize;

/// Output format for projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// What a projection includes.
#[derive(Debug, Clone, Default)]
pub struct ProjectionOptions {
    /// Emit phase headings (markdown) or annotate top-level tasks with their
    /// phase (JSON).
    pub include_phases: bool,
    /// Restrict output to these subtrees, in the order given.
    pub task_ids: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "no_front_matter")]
    front_matter: &'a FrontMatter,
    tasks: Vec<JsonTask<'a>>,
    #[serde(skip_serializing_if = "no_phases")]
    phases: &'a [PhaseMarker],
    stats: Stats,
}

fn no_front_matter(fm: &&FrontMatter) -> bool {
    fm.is_empty()
}

fn no_phases(phases: &&[PhaseMarker]) -> bool {
    phases.is_empty()
}

#[derive(Serialize)]
struct JsonTask<'a> {
    #[serde(flatten)]
    task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<&'a str>,
}

/// Project `doc` into `format`.
pub fn project(doc: &Document, format: OutputFormat, opts: &ProjectionOptions) -> TaskResult<String> {
    let selected = select(doc, opts)?;
    match format {
        OutputFormat::Markdown => Ok(match selected {
            Some(tasks) => render::render_tasks(&doc.list, &tasks),
            None if opts.include_phases => render::render(doc),
            None => render::render_list(&doc.list),
        }),
        OutputFormat::Json => {
            // Stats cover the projected subtrees only
            let tasks: Vec<&Task> = selected.unwrap_or_else(|| doc.list.tasks.iter().collect());
            let stats = Stats::from_tasks(tasks.iter().copied());
            let tasks = tasks
                .into_iter()
                .map(|task| JsonTask {
                    task,
                    phase: opts
                        .include_phases
                        .then(|| top_level_phase(doc, task))
                        .flatten(),
                })
                .collect();
            let projection = JsonDocument {
                title: &doc.list.title,
                front_matter: &doc.list.front_matter,
                tasks,
                phases: if opts.include_phases {
                    doc.phases.as_slice()
                } else {
                    &[]
                },
                stats,
            };
            Ok(serde_json::to_string_pretty(&projection)?)
        }
    }
}

fn select<'a>(doc: &'a Document, opts: &ProjectionOptions) -> TaskResult<Option<Vec<&'a Task>>> {
    let Some(ids) = &opts.task_ids else {
        return Ok(None);
    };
    ids.iter()
        .map(|id| {
            doc.list
                .find_task(id)
                .ok_or_else(|| TaskError::TaskNotFound(id.clone()))
        })
        .collect::<TaskResult<Vec<_>>>()
        .map(Some)
}

/// Phase of the top-level ancestor of `task`.
fn top_level_phase<'a>(doc: &'a Document, task: &Task) -> Option<&'a str> {
    let root = task.id.split('.').next()?.parse::<usize>().ok()?;
    doc.phase_of(root.checked_sub(1)?)
}
