//! Mutation engine.
//!
//! Every operation validates its inputs before touching the tree, so a failed
//! call leaves the document exactly as it was. Text fields are normalised on
//! the way in so whatever the engine writes parses back to the same tree.

use crate::config::{BehaviorConfig, Limits};
use crate::error::{TaskError, TaskResult, WARN_DEPENDENTS_REMOVED, Warning};
use crate::frontmatter;
use crate::graph::DependencyIndex;
use crate::ids::{self, StableIdGenerator};
use crate::parse::{self, Continuation, STABLE_ID_COMMENT};
use crate::query;
use crate::types::{Document, PhaseMarker, Status, Task, TaskList};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Optional fields set atomically with a new task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InsertOptions {
    pub details: Vec<String>,
    pub references: Vec<String>,
    pub requirements: Vec<String>,
    /// Positive stream; 0 or absent leaves the task inheriting.
    pub stream: Option<i64>,
    pub owner: Option<String>,
    /// Hierarchical or stable IDs of blocking tasks.
    pub blocked_by: Vec<String>,
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateFields {
    pub title: Option<String>,
    pub details: Option<Vec<String>>,
    pub references: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    /// 0 clears the explicit stream.
    pub stream: Option<i64>,
    /// Replaces the blocker list; an empty list clears it.
    pub blocked_by: Option<Vec<String>>,
    /// An empty owner clears it.
    pub owner: Option<String>,
    /// Clear the owner. Wins over `owner`.
    pub release: bool,
}

impl UpdateFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.details.is_none()
            && self.references.is_none()
            && self.requirements.is_none()
            && self.stream.is_none()
            && self.blocked_by.is_none()
            && self.owner.is_none()
            && !self.release
    }
}

/// Which ready tasks [`Document::claim_ready`] takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimScope {
    /// The first ready task in document order.
    Next,
    /// Every ready task whose effective stream matches.
    Stream(u32),
    /// Every ready task of the stream in the next phase that has work for it.
    PhaseStream(u32),
}

fn has_control(s: &str) -> bool {
    s.chars().any(char::is_control)
}

pub(crate) fn normalize_title(title: &str, limits: &Limits) -> TaskResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskError::invalid("title", "must not be empty"));
    }
    if has_control(title) {
        return Err(TaskError::invalid("title", "contains control characters"));
    }
    if STABLE_ID_COMMENT.is_match(title) {
        return Err(TaskError::invalid("title", "must not contain a stable ID comment"));
    }
    if title.len() > limits.max_title_length {
        return Err(TaskError::invalid(
            "title",
            format!("exceeds maximum length of {} characters", limits.max_title_length),
        ));
    }
    Ok(title.to_string())
}

pub(crate) fn normalize_details(details: &[String], limits: &Limits) -> TaskResult<Vec<String>> {
    details
        .iter()
        .enumerate()
        .map(|(i, detail)| {
            let n = i + 1;
            let detail = detail.trim();
            if detail.is_empty() {
                return Err(TaskError::invalid("details", format!("detail {n} is empty")));
            }
            if has_control(detail) {
                return Err(TaskError::invalid(
                    "details",
                    format!("detail {n} contains control characters"),
                ));
            }
            if detail.len() > limits.max_detail_length {
                return Err(TaskError::invalid(
                    "details",
                    format!(
                        "detail {n} exceeds maximum length of {} characters",
                        limits.max_detail_length
                    ),
                ));
            }
            // A detail must read back as a detail, not as metadata or a subtask
            let reparses = parse::classify(detail) == Continuation::Detail
                && matches!(parse::parse_task_line(&format!("- {detail}"), 0), Ok(None));
            if !reparses {
                return Err(TaskError::invalid(
                    "details",
                    format!("detail {n} would be read back as metadata or a task"),
                ));
            }
            Ok(detail.to_string())
        })
        .collect()
}

pub(crate) fn normalize_references(references: &[String]) -> TaskResult<Vec<String>> {
    references
        .iter()
        .enumerate()
        .map(|(i, reference)| {
            let n = i + 1;
            let reference = reference.trim();
            if reference.is_empty() {
                return Err(TaskError::invalid("references", format!("reference {n} is empty")));
            }
            if reference.contains(',') || has_control(reference) {
                return Err(TaskError::invalid(
                    "references",
                    format!("reference {n} contains a comma or control characters"),
                ));
            }
            Ok(reference.to_string())
        })
        .collect()
}

pub(crate) fn validate_requirements(requirements: &[String]) -> TaskResult<Vec<String>> {
    requirements
        .iter()
        .map(|r| {
            let r = r.trim();
            if ids::is_valid_id(r) {
                Ok(r.to_string())
            } else {
                Err(TaskError::InvalidRequirement(r.to_string()))
            }
        })
        .collect()
}

/// Trimmed owner; empty means no owner.
pub(crate) fn normalize_owner(owner: &str) -> TaskResult<Option<String>> {
    let owner = owner.trim();
    if has_control(owner) {
        return Err(TaskError::InvalidOwner);
    }
    Ok((!owner.is_empty()).then(|| owner.to_string()))
}

pub(crate) fn validate_stream(stream: i64) -> TaskResult<u32> {
    u32::try_from(stream).map_err(|_| TaskError::InvalidStream)
}

pub fn validate_phase_name(name: &str) -> TaskResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TaskError::invalid("phase", "phase name cannot be empty"));
    }
    if has_control(name) {
        return Err(TaskError::invalid("phase", "contains control characters"));
    }
    Ok(name.to_string())
}

fn parse_position(position: &str) -> TaskResult<usize> {
    let position = position.trim();
    if !ids::is_valid_id(position) {
        return Err(TaskError::InvalidPosition(position.to_string()));
    }
    ids::last_segment(position)
        .map(|n| n - 1)
        .ok_or_else(|| TaskError::InvalidPosition(position.to_string()))
}

/// A validated insert, ready to apply.
struct PreparedInsert {
    path: Vec<usize>,
    index: usize,
    task: Task,
}

impl TaskList {
    fn check_limits(&self, parent_id: &str, limits: &Limits) -> TaskResult<()> {
        if self.count() >= limits.max_tasks {
            return Err(TaskError::LimitExceeded(format!(
                "maximum task limit of {} reached",
                limits.max_tasks
            )));
        }
        if !parent_id.is_empty() && ids::level(parent_id) >= limits.max_depth {
            return Err(TaskError::LimitExceeded(format!(
                "maximum hierarchy depth of {} reached",
                limits.max_depth
            )));
        }
        Ok(())
    }

    fn siblings(&self, path: &[usize]) -> Option<&Vec<Task>> {
        if path.is_empty() {
            Some(&self.tasks)
        } else {
            self.task_at_path(path).map(|t| &t.children)
        }
    }

    fn siblings_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Task>> {
        if path.is_empty() {
            Some(&mut self.tasks)
        } else {
            self.task_at_path_mut(path).map(|t| &mut t.children)
        }
    }

    /// Resolve blocker tokens to stable IDs.
    ///
    /// A token naming an existing hierarchical ID resolves to that task's
    /// stable ID; otherwise it must be an existing stable ID.
    fn resolve_blockers(&self, tokens: &[String]) -> TaskResult<Vec<String>> {
        let mut resolved: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let token = token.trim();
            let stable_id = if let Some(task) = self.find_task(token) {
                task.stable_id
                    .clone()
                    .ok_or_else(|| TaskError::NoStableId(token.to_string()))?
            } else if ids::is_valid_stable_id(token) && self.find_by_stable_id(token).is_some() {
                token.to_string()
            } else {
                return Err(TaskError::TaskNotFound(token.to_string()));
            };
            if !resolved.contains(&stable_id) {
                resolved.push(stable_id);
            }
        }
        Ok(resolved)
    }

    fn prepare_insert(
        &self,
        parent_id: &str,
        title: &str,
        position: Option<&str>,
        opts: &InsertOptions,
        limits: &Limits,
    ) -> TaskResult<PreparedInsert> {
        let title = normalize_title(title, limits)?;
        let path = if parent_id.is_empty() {
            Vec::new()
        } else {
            let path = ids::index_path(parent_id)
                .ok_or_else(|| TaskError::InvalidId(parent_id.to_string()))?;
            if self.task_at_path(&path).is_none() {
                return Err(TaskError::ParentNotFound(parent_id.to_string()));
            }
            path
        };
        self.check_limits(parent_id, limits)?;

        let sibling_count = self.siblings(&path).map_or(0, Vec::len);
        let index = match position {
            Some(position) => parse_position(position)?.min(sibling_count),
            None => sibling_count,
        };

        let mut task = Task::new(title);
        task.details = normalize_details(&opts.details, limits)?;
        task.references = normalize_references(&opts.references)?;
        task.requirements = validate_requirements(&opts.requirements)?;
        if let Some(stream) = opts.stream {
            task.stream = validate_stream(stream)?;
        }
        if let Some(owner) = &opts.owner {
            task.owner = normalize_owner(owner)?;
        }
        task.blocked_by = self.resolve_blockers(&opts.blocked_by)?;
        task.stable_id = Some(StableIdGenerator::new(self.stable_ids()).generate()?);

        Ok(PreparedInsert { path, index, task })
    }

    fn apply_insert(&mut self, prepared: PreparedInsert) -> TaskResult<String> {
        let PreparedInsert { path, index, task } = prepared;
        let siblings = self
            .siblings_mut(&path)
            .ok_or_else(|| TaskError::TaskNotFound(format!("{path:?}")))?;
        siblings.insert(index, task);
        self.renumber();

        let mut new_path = path;
        new_path.push(index);
        let task = self
            .task_at_path(&new_path)
            .ok_or_else(|| TaskError::TaskNotFound(format!("{new_path:?}")))?;
        info!(
            id = %task.id,
            stable_id = task.stable_id.as_deref().unwrap_or(""),
            "inserted task"
        );
        Ok(task.id.clone())
    }

    /// Insert a task with default limits. See [`TaskList::insert_with_limits`].
    pub fn insert(
        &mut self,
        parent_id: &str,
        title: &str,
        position: Option<&str>,
        opts: &InsertOptions,
    ) -> TaskResult<String> {
        self.insert_with_limits(parent_id, title, position, opts, &Limits::default())
    }

    /// Insert a new task and return its hierarchical ID.
    ///
    /// An empty `parent_id` inserts at top level. `position` is a 1-based
    /// sibling index, or an ID whose last segment is that index; positions
    /// past the end append. The new task gets a stable ID immediately.
    pub fn insert_with_limits(
        &mut self,
        parent_id: &str,
        title: &str,
        position: Option<&str>,
        opts: &InsertOptions,
        limits: &Limits,
    ) -> TaskResult<String> {
        let prepared = self.prepare_insert(parent_id, title, position, opts, limits)?;
        self.apply_insert(prepared)
    }

    pub fn update(&mut self, task_id: &str, fields: &UpdateFields) -> TaskResult<()> {
        self.update_with_limits(task_id, fields, &Limits::default())
    }

    /// Apply a partial update. Only fields present in `fields` change.
    pub fn update_with_limits(
        &mut self,
        task_id: &str,
        fields: &UpdateFields,
        limits: &Limits,
    ) -> TaskResult<()> {
        let task = self
            .find_task(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;

        let title = fields
            .title
            .as_deref()
            .map(|t| normalize_title(t, limits))
            .transpose()?;
        let details = fields
            .details
            .as_deref()
            .map(|d| normalize_details(d, limits))
            .transpose()?;
        let references = fields
            .references
            .as_deref()
            .map(normalize_references)
            .transpose()?;
        let requirements = fields
            .requirements
            .as_deref()
            .map(validate_requirements)
            .transpose()?;
        let stream = fields.stream.map(validate_stream).transpose()?;
        let owner = match (&fields.owner, fields.release) {
            (_, true) => Some(None),
            (Some(owner), false) => Some(normalize_owner(owner)?),
            (None, false) => None,
        };
        let blocked_by = match &fields.blocked_by {
            Some(tokens) => Some(self.validated_blockers(task, tokens)?),
            None => None,
        };

        let task = self
            .find_task_mut(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(details) = details {
            task.details = details;
        }
        if let Some(references) = references {
            task.references = references;
        }
        if let Some(requirements) = requirements {
            task.requirements = requirements;
        }
        if let Some(stream) = stream {
            task.stream = stream;
        }
        if let Some(owner) = owner {
            task.owner = owner;
        }
        if let Some(blocked_by) = blocked_by {
            task.blocked_by = blocked_by;
        }
        info!(id = %task_id, "updated task");
        Ok(())
    }

    /// Resolve blockers for an existing task and reject edges that would
    /// close a dependency cycle.
    fn validated_blockers(&self, task: &Task, tokens: &[String]) -> TaskResult<Vec<String>> {
        let resolved = self.resolve_blockers(tokens)?;
        if resolved.is_empty() {
            return Ok(resolved);
        }
        // Nothing can reference a task without a stable ID, so it closes no cycle
        let Some(from) = task.stable_id.as_deref() else {
            return Ok(resolved);
        };

        let index = DependencyIndex::build(self);
        for to in &resolved {
            if let Some(path) = index.detect_cycle(from, to) {
                return Err(TaskError::CircularDependency { path });
            }
        }
        Ok(resolved)
    }

    /// Detach a task and its subtree. Remaining tasks that were blocked by
    /// anything in the subtree lose those edges; each is reported as a
    /// warning.
    pub fn remove(&mut self, task_id: &str) -> TaskResult<Vec<Warning>> {
        self.remove_at(task_id).map(|(_, warnings)| warnings)
    }

    /// Remove and return the removed task's index path with the warnings.
    fn remove_at(&mut self, task_id: &str) -> TaskResult<(Vec<usize>, Vec<Warning>)> {
        let not_found = || TaskError::TaskNotFound(task_id.to_string());
        let path =
            ids::index_path(task_id).ok_or_else(|| TaskError::InvalidId(task_id.to_string()))?;
        let (index, parent_path) = path.split_last().ok_or_else(not_found)?;
        let siblings = self.siblings_mut(parent_path).ok_or_else(not_found)?;
        if *index >= siblings.len() {
            return Err(not_found());
        }
        let removed = siblings.remove(*index);
        self.renumber();

        let gone: HashSet<&str> = removed.walk().filter_map(|t| t.stable_id.as_deref()).collect();
        let mut warnings = Vec::new();
        if !gone.is_empty() {
            strip_blockers(&mut self.tasks, &gone, &mut warnings);
        }
        info!(
            id = %task_id,
            removed = removed.walk().count(),
            dependents = warnings.len(),
            "removed task"
        );
        Ok((path, warnings))
    }

    /// Direct status transition. Never cascades to parents.
    pub fn set_status(&mut self, task_id: &str, status: Status) -> TaskResult<()> {
        let task = self
            .find_task_mut(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;
        task.status = status;
        info!(id = %task_id, status = %status, "set task status");
        Ok(())
    }

    /// Mark a task in progress and record its owner.
    pub fn claim(&mut self, task_id: &str, owner: &str) -> TaskResult<()> {
        let owner = normalize_owner(owner)?
            .ok_or_else(|| TaskError::invalid("owner", "must not be empty"))?;
        let task = self
            .find_task_mut(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;
        task.status = Status::InProgress;
        task.owner = Some(owner);
        info!(id = %task_id, owner = task.owner.as_deref().unwrap_or(""), "claimed task");
        Ok(())
    }

    pub fn release(&mut self, task_id: &str) -> TaskResult<()> {
        let task = self
            .find_task_mut(task_id)
            .ok_or_else(|| TaskError::TaskNotFound(task_id.to_string()))?;
        task.owner = None;
        info!(id = %task_id, "released task");
        Ok(())
    }

    /// Complete a task, then apply the parent auto-completion policy.
    /// Returns the IDs of ancestors completed as a consequence.
    pub fn complete(&mut self, task_id: &str, behavior: &BehaviorConfig) -> TaskResult<Vec<String>> {
        self.set_status(task_id, Status::Completed)?;
        if !behavior.auto_complete_parents {
            return Ok(Vec::new());
        }
        Ok(self.auto_complete_parents(task_id))
    }

    /// Walk up from `task_id`, completing every ancestor whose whole subtree
    /// is Completed. Ancestors that stay incomplete do not stop the walk.
    pub fn auto_complete_parents(&mut self, task_id: &str) -> Vec<String> {
        let mut completed = Vec::new();
        let mut current = ids::parent_id(task_id);
        while let Some(parent_id) = current {
            if let Some(parent) = self.find_task_mut(parent_id) {
                let subtree_done = parent
                    .walk()
                    .skip(1)
                    .all(|t| t.status == Status::Completed);
                if subtree_done && parent.status != Status::Completed {
                    parent.status = Status::Completed;
                    completed.push(parent_id.to_string());
                }
            }
            current = ids::parent_id(parent_id);
        }
        if !completed.is_empty() {
            debug!(ids = ?completed, "auto-completed parents");
        }
        completed
    }

    /// Give every task lacking a stable ID a fresh one. Returns the
    /// hierarchical IDs of the tasks touched.
    pub fn assign_stable_ids(&mut self) -> TaskResult<Vec<String>> {
        let mut generator = StableIdGenerator::new(self.stable_ids());
        let mut touched = Vec::new();
        assign_missing(&mut self.tasks, &mut generator, &mut touched)?;
        if !touched.is_empty() {
            info!(count = touched.len(), "assigned stable IDs");
        }
        Ok(touched)
    }

    /// Append references and upsert metadata in the front matter.
    pub fn add_front_matter(
        &mut self,
        references: &[String],
        metadata: &[(String, String)],
    ) -> TaskResult<()> {
        let references = normalize_references(references)?;
        for (key, value) in metadata {
            frontmatter::validate_metadata_key(key)?;
            if has_control(value) {
                return Err(TaskError::invalid("metadata", format!("value for {key} contains control characters")));
            }
        }
        self.front_matter.merge(&references, metadata);
        Ok(())
    }
}

fn strip_blockers(tasks: &mut [Task], gone: &HashSet<&str>, warnings: &mut Vec<Warning>) {
    for task in tasks {
        let before = task.blocked_by.len();
        task.blocked_by.retain(|b| !gone.contains(b.as_str()));
        if task.blocked_by.len() != before {
            warnings.push(Warning {
                code: WARN_DEPENDENTS_REMOVED,
                message: format!("task {} lost dependencies on removed tasks", task.id),
                task_id: Some(task.id.clone()),
            });
        }
        strip_blockers(&mut task.children, gone, warnings);
    }
}

fn assign_missing(
    tasks: &mut [Task],
    generator: &mut StableIdGenerator,
    touched: &mut Vec<String>,
) -> TaskResult<()> {
    for task in tasks {
        if task.stable_id.is_none() {
            task.stable_id = Some(generator.generate()?);
            touched.push(task.id.clone());
        }
        assign_missing(&mut task.children, generator, touched)?;
    }
    Ok(())
}

impl Document {
    /// Insert keeping phase headings attached to the tasks around them.
    ///
    /// A top-level insert at index k shifts every heading positioned after k.
    pub fn insert(
        &mut self,
        parent_id: &str,
        title: &str,
        position: Option<&str>,
        opts: &InsertOptions,
    ) -> TaskResult<String> {
        self.insert_with_limits(parent_id, title, position, opts, &Limits::default())
    }

    pub fn insert_with_limits(
        &mut self,
        parent_id: &str,
        title: &str,
        position: Option<&str>,
        opts: &InsertOptions,
        limits: &Limits,
    ) -> TaskResult<String> {
        let prepared = self
            .list
            .prepare_insert(parent_id, title, position, opts, limits)?;
        let top_level = prepared.path.is_empty().then_some(prepared.index);
        let id = self.list.apply_insert(prepared)?;
        if let Some(k) = top_level {
            for marker in self.phases.iter_mut().filter(|m| m.position > k) {
                marker.position += 1;
            }
        }
        Ok(id)
    }

    pub fn insert_into_phase(
        &mut self,
        phase: &str,
        parent_id: &str,
        title: &str,
        opts: &InsertOptions,
    ) -> TaskResult<String> {
        self.insert_into_phase_with_limits(phase, parent_id, title, opts, &Limits::default())
    }

    /// Append a top-level task at the end of the named phase's run, creating
    /// the phase at the end of the document if it does not exist. With a
    /// parent, the task is appended under that parent instead; a missing
    /// phase is still created.
    pub fn insert_into_phase_with_limits(
        &mut self,
        phase: &str,
        parent_id: &str,
        title: &str,
        opts: &InsertOptions,
        limits: &Limits,
    ) -> TaskResult<String> {
        let phase = validate_phase_name(phase)?;
        let existing = self
            .phase_ranges()
            .into_iter()
            .find(|r| r.name == phase)
            .map(|r| (r.marker, r.end));

        let id = if parent_id.is_empty() {
            let mut prepared = self.list.prepare_insert("", title, None, opts, limits)?;
            let (marker, end) = existing.unwrap_or((self.phases.len(), self.list.tasks.len()));
            prepared.index = end;
            let id = self.list.apply_insert(prepared)?;
            for later in self.phases.iter_mut().skip(marker + 1) {
                later.position += 1;
            }
            if existing.is_none() {
                self.phases.push(PhaseMarker::new(phase.as_str(), end));
            }
            id
        } else {
            let prepared = self
                .list
                .prepare_insert(parent_id, title, None, opts, limits)?;
            let id = self.list.apply_insert(prepared)?;
            if existing.is_none() {
                self.phases
                    .push(PhaseMarker::new(phase.as_str(), self.list.tasks.len()));
            }
            id
        };

        if existing.is_none() {
            info!(phase = %phase, "created phase");
        }
        Ok(id)
    }

    /// Remove a task, shifting phase headings after a removed top-level task.
    pub fn remove(&mut self, task_id: &str) -> TaskResult<Vec<Warning>> {
        let (path, warnings) = self.list.remove_at(task_id)?;
        if let [k] = path.as_slice() {
            for marker in self.phases.iter_mut().filter(|m| m.position > *k) {
                marker.position -= 1;
            }
        }
        Ok(warnings)
    }

    /// Append a phase heading after the last task.
    pub fn add_phase(&mut self, name: &str) -> TaskResult<()> {
        let name = validate_phase_name(name)?;
        info!(phase = %name, position = self.list.tasks.len(), "added phase");
        self.phases
            .push(PhaseMarker::new(name, self.list.tasks.len()));
        Ok(())
    }

    /// Claim ready tasks for `owner`. Returns the claimed hierarchical IDs,
    /// empty when nothing is ready.
    pub fn claim_ready(&mut self, owner: &str, scope: ClaimScope) -> TaskResult<Vec<String>> {
        if normalize_owner(owner)?.is_none() {
            return Err(TaskError::invalid("owner", "must not be empty"));
        }
        if let ClaimScope::Stream(0) | ClaimScope::PhaseStream(0) = scope {
            return Err(TaskError::InvalidStream);
        }

        let targets: Vec<String> = {
            let index = DependencyIndex::build(&self.list);
            match scope {
                ClaimScope::Next => index.ready().first().map(|t| t.id.clone()).into_iter().collect(),
                ClaimScope::Stream(stream) => index
                    .filter_by_stream(&index.ready(), stream)
                    .iter()
                    .map(|t| t.id.clone())
                    .collect(),
                ClaimScope::PhaseStream(stream) => {
                    match query::find_next_phase_tasks_for_stream(self, stream)? {
                        Some(phase) => phase
                            .tasks
                            .iter()
                            .flat_map(|t| t.walk())
                            .filter(|t| index.is_ready(t) && index.effective_stream(&t.id) == stream)
                            .map(|t| t.id.clone())
                            .collect(),
                        None => Vec::new(),
                    }
                }
            }
        };

        for id in &targets {
            self.list.claim(id, owner)?;
        }
        Ok(targets)
    }
}
