//! Atomic multi-operation execution.
//!
//! Operations run in order against a clone of the document. The first
//! failure discards the clone; otherwise the clone replaces the document (or,
//! in a dry run, is rendered as a preview and discarded).

use crate::config::Config;
use crate::error::{TaskError, TaskResult, Warning};
use crate::ops::{InsertOptions, UpdateFields};
use crate::render;
use crate::types::{Document, Status};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One batch step, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    Add {
        #[serde(default)]
        parent: String,
        title: String,
        #[serde(default)]
        position: Option<String>,
        /// Append at the end of this phase instead of at `position`.
        #[serde(default)]
        phase: Option<String>,
        #[serde(flatten)]
        options: InsertOptions,
    },
    Remove {
        id: String,
    },
    Update {
        id: String,
        #[serde(default)]
        status: Option<Status>,
        #[serde(flatten)]
        fields: UpdateFields,
    },
    AddPhase {
        phase: String,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Remove { .. } => "remove",
            Operation::Update { .. } => "update",
            Operation::AddPhase { .. } => "add-phase",
        }
    }
}

/// Outcome of [`execute_batch`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    /// Operations applied (or that would be, in a dry run).
    pub applied: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Rendered document after the batch, dry runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Parents completed by the auto-completion policy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auto_completed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

pub fn execute_batch(doc: &mut Document, ops: &[Operation], dry_run: bool) -> BatchResponse {
    execute_batch_with_config(doc, ops, dry_run, &Config::default())
}

/// Run `ops` atomically. On failure the response carries
/// `operation N: <error>` (1-based) and `doc` is untouched.
pub fn execute_batch_with_config(
    doc: &mut Document,
    ops: &[Operation],
    dry_run: bool,
    config: &Config,
) -> BatchResponse {
    let mut working = doc.clone();
    let mut response = BatchResponse::default();

    for (i, op) in ops.iter().enumerate() {
        debug!(index = i + 1, op = op.name(), "applying batch operation");
        if let Err(err) = apply(&mut working, op, config, &mut response) {
            warn!(index = i + 1, op = op.name(), error = %err, "batch operation failed");
            return BatchResponse {
                success: false,
                applied: 0,
                errors: vec![format!("operation {}: {err}", i + 1)],
                ..Default::default()
            };
        }
        response.applied += 1;
    }

    response.success = true;
    if dry_run {
        response.preview = Some(render::render(&working));
    } else {
        *doc = working;
        info!(
            applied = response.applied,
            auto_completed = response.auto_completed.len(),
            "applied batch"
        );
    }
    response
}

fn apply(
    doc: &mut Document,
    op: &Operation,
    config: &Config,
    response: &mut BatchResponse,
) -> TaskResult<()> {
    let limits = &config.limits;
    match op {
        Operation::Add {
            parent,
            title,
            position,
            phase,
            options,
        } => {
            match (phase, position) {
                (Some(_), Some(_)) => {
                    return Err(TaskError::invalid(
                        "position",
                        "cannot be combined with phase",
                    ));
                }
                (Some(phase), None) => {
                    doc.insert_into_phase_with_limits(phase, parent, title, options, limits)?;
                }
                (None, position) => {
                    doc.insert_with_limits(parent, title, position.as_deref(), options, limits)?;
                }
            }
        }
        Operation::Remove { id } => {
            response.warnings.extend(doc.remove(id)?);
        }
        Operation::Update { id, status, fields } => {
            doc.list.update_with_limits(id, fields, limits)?;
            match status {
                Some(Status::Completed) => {
                    for parent in doc.list.complete(id, &config.behavior)? {
                        if !response.auto_completed.contains(&parent) {
                            response.auto_completed.push(parent);
                        }
                    }
                }
                Some(status) => doc.list.set_status(id, *status)?,
                None => {}
            }
        }
        Operation::AddPhase { phase } => doc.add_phase(phase)?,
    }
    Ok(())
}
