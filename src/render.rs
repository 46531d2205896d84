//! Markdown serializer, the inverse of [`crate::parse`].

use crate::frontmatter;
use crate::ids;
use crate::types::{Document, PhaseMarker, Task, TaskList};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::debug;

/// Render a whole document: front matter, title, phases and tasks.
pub fn render(doc: &Document) -> String {
    let mut out = frontmatter::serialize(&doc.list.front_matter);
    out.push_str(&render_body(&doc.list, &doc.phases));
    debug!(bytes = out.len(), "rendered task document");
    out
}

/// Render a task list without phase headings.
pub fn render_list(list: &TaskList) -> String {
    let mut out = frontmatter::serialize(&list.front_matter);
    out.push_str(&render_body(list, &[]));
    out
}

/// Render title, phase headings and tasks. Front matter is not included.
///
/// Top-level task blocks and phase headings are separated by one blank line.
/// A heading is emitted before the top-level task at its position; headings
/// positioned past the last task go at the end.
pub fn render_body(list: &TaskList, phases: &[PhaseMarker]) -> String {
    let ctx = RenderContext::new(list);
    let mut blocks: Vec<String> = Vec::with_capacity(list.tasks.len() + phases.len());
    let mut markers = phases.iter().peekable();

    for (i, task) in list.tasks.iter().enumerate() {
        while let Some(marker) = markers.next_if(|m| m.position <= i) {
            blocks.push(phase_heading(marker));
        }
        let mut block = String::new();
        ctx.task(&mut block, task, &(i + 1).to_string(), 0);
        blocks.push(block);
    }
    blocks.extend(markers.map(phase_heading));

    let mut out = format!("# {}\n\n", list.title);
    out.push_str(&blocks.join("\n"));
    out
}

/// Render selected subtrees, each at top-level indentation, keeping their
/// current hierarchical IDs.
pub fn render_tasks(list: &TaskList, tasks: &[&Task]) -> String {
    let ctx = RenderContext::new(list);
    let blocks: Vec<String> = tasks
        .iter()
        .map(|task| {
            let mut block = String::new();
            ctx.task(&mut block, task, &task.id, 0);
            block
        })
        .collect();
    blocks.join("\n")
}

fn phase_heading(marker: &PhaseMarker) -> String {
    format!("## {}\n", marker.name)
}

struct RenderContext<'a> {
    titles: HashMap<&'a str, &'a str>,
    requirements_file: &'a str,
}

impl<'a> RenderContext<'a> {
    fn new(list: &'a TaskList) -> Self {
        let titles = list
            .walk()
            .filter_map(|t| Some((t.stable_id.as_deref()?, t.title.as_str())))
            .collect();
        Self {
            titles,
            requirements_file: &list.requirements_file,
        }
    }

    fn task(&self, out: &mut String, task: &Task, id: &str, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}- {} {id}. {}", task.status.marker(), task.title);
        if let Some(stable_id) = &task.stable_id {
            let _ = write!(out, " <!-- id:{stable_id} -->");
        }
        out.push('\n');

        for detail in &task.details {
            let _ = writeln!(out, "{indent}  - {detail}");
        }

        if !task.requirements.is_empty() {
            let links: Vec<String> = task
                .requirements
                .iter()
                .map(|req| format!("[{req}]({}#{req})", self.requirements_file))
                .collect();
            let _ = writeln!(out, "{indent}  - Requirements: {}", links.join(", "));
        }

        if !task.references.is_empty() {
            let _ = writeln!(out, "{indent}  - References: {}", task.references.join(", "));
        }

        if task.stream > 0 {
            let _ = writeln!(out, "{indent}  - Stream: {}", task.stream);
        }

        if let Some(owner) = &task.owner {
            let _ = writeln!(out, "{indent}  - Owner: {owner}");
        }

        if !task.blocked_by.is_empty() {
            let blockers: Vec<String> = task
                .blocked_by
                .iter()
                .map(|stable_id| match self.titles.get(stable_id.as_str()) {
                    Some(title) => format!("{stable_id} ({})", title.replace(['(', ')'], "")),
                    None => stable_id.clone(),
                })
                .collect();
            let _ = writeln!(out, "{indent}  - Blocked-by: {}", blockers.join(", "));
        }

        for (i, child) in task.children.iter().enumerate() {
            self.task(out, child, &ids::child_id(id, i + 1), depth + 1);
        }
    }
}
