//! Structured error types for the task engine.
//!
//! Every engine operation fails with a [`TaskError`]; parse failures carry a
//! [`ParseError`] with the offending line. Callers that need a stable,
//! machine-readable classification use [`TaskError::code`].

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Parse errors
    ParseError,

    // Not found errors
    TaskNotFound,
    PhaseNotFound,

    // Validation errors
    InvalidPosition,
    InvalidFieldValue,
    MissingStableId,
    LimitExceeded,

    // Integrity errors
    DependencyCycle,

    // Storage errors
    IoError,
    InternalError,
}

/// Coarse category of an [`ErrorCode`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    NotFound,
    Validation,
    Integrity,
    Io,
}

impl ErrorCode {
    pub fn kind(self) -> ErrorKind {
        match self {
            ErrorCode::ParseError => ErrorKind::Parse,
            ErrorCode::TaskNotFound | ErrorCode::PhaseNotFound => ErrorKind::NotFound,
            ErrorCode::InvalidPosition
            | ErrorCode::InvalidFieldValue
            | ErrorCode::MissingStableId
            | ErrorCode::LimitExceeded => ErrorKind::Validation,
            ErrorCode::DependencyCycle | ErrorCode::InternalError => ErrorKind::Integrity,
            ErrorCode::IoError => ErrorKind::Io,
        }
    }
}

/// A parse failure. The whole parse fails; no partial tree is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unclosed front matter block")]
    UnclosedFrontMatter,

    #[error("parsing front matter: {message}")]
    FrontMatter { message: String },

    #[error("line {line}: invalid status: {marker}")]
    InvalidStatus { line: usize, marker: String },

    #[error("line {line}: invalid task format: {reason}")]
    InvalidTaskFormat { line: usize, reason: String },

    #[error("line {line}: unexpected indentation (tabs not allowed)")]
    TabIndentation { line: usize },

    #[error("line {line}: unexpected indentation (must be a multiple of 2 spaces)")]
    OddIndentation { line: usize },

    #[error("line {line}: indentation skips a level (expected at most depth {expected}, found {found})")]
    SkippedDepth {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: task number {id} does not match indentation depth {depth}")]
    DepthMismatch {
        line: usize,
        id: String,
        depth: usize,
    },

    #[error("line {line}: unexpected content at this indentation level")]
    UnexpectedContent { line: usize },

    #[error("line {line}: malformed {field} metadata")]
    InvalidMetadata { line: usize, field: &'static str },

    #[error("line {line}: blocked-by references unknown stable ID {stable_id}")]
    UnknownBlocker { line: usize, stable_id: String },

    #[error("line {line}: duplicate stable ID {stable_id}")]
    DuplicateStableId { line: usize, stable_id: String },

    #[error("file exceeds maximum size of {limit} bytes")]
    FileTooLarge { limit: usize },

    #[error("line {line}: task nesting exceeds maximum depth of {limit}")]
    TooDeep { line: usize, limit: usize },

    #[error("line {line}: document exceeds maximum of {limit} tasks")]
    TooManyTasks { line: usize, limit: usize },
}

impl ParseError {
    /// 1-based line of the failure, when the error is tied to one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::InvalidStatus { line, .. }
            | ParseError::InvalidTaskFormat { line, .. }
            | ParseError::TabIndentation { line }
            | ParseError::OddIndentation { line }
            | ParseError::SkippedDepth { line, .. }
            | ParseError::DepthMismatch { line, .. }
            | ParseError::UnexpectedContent { line }
            | ParseError::InvalidMetadata { line, .. }
            | ParseError::UnknownBlocker { line, .. }
            | ParseError::DuplicateStableId { line, .. }
            | ParseError::TooDeep { line, .. }
            | ParseError::TooManyTasks { line, .. } => Some(*line),
            ParseError::UnclosedFrontMatter
            | ParseError::FrontMatter { .. }
            | ParseError::FileTooLarge { .. } => None,
        }
    }
}

/// Error returned by every engine operation.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("parent task {0} not found")]
    ParentNotFound(String),

    #[error("phase {0} not found")]
    PhaseNotFound(String),

    #[error("invalid position format: {0}")]
    InvalidPosition(String),

    #[error("invalid task ID format: {0}")]
    InvalidId(String),

    #[error("invalid requirement ID format: {0}")]
    InvalidRequirement(String),

    #[error("stream must be a positive integer")]
    InvalidStream,

    #[error("owner contains invalid characters")]
    InvalidOwner,

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("task {0} does not have a stable ID")]
    NoStableId(String),

    #[error("{}", cycle_message(.path))]
    CircularDependency { path: Vec<String> },

    #[error("{0}")]
    LimitExceeded(String),

    #[error("stable ID space exhausted")]
    StableIdExhausted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn cycle_message(path: &[String]) -> String {
    if path.len() == 2 && path[0] == path[1] {
        format!("task cannot depend on itself: {}", path[0])
    } else {
        format!("circular dependency detected: {}", path.join(" → "))
    }
}

impl TaskError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        TaskError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TaskError::Parse(_) => ErrorCode::ParseError,
            TaskError::TaskNotFound(_) | TaskError::ParentNotFound(_) => ErrorCode::TaskNotFound,
            TaskError::PhaseNotFound(_) => ErrorCode::PhaseNotFound,
            TaskError::InvalidPosition(_) => ErrorCode::InvalidPosition,
            TaskError::InvalidId(_)
            | TaskError::InvalidRequirement(_)
            | TaskError::InvalidStream
            | TaskError::InvalidOwner
            | TaskError::InvalidInput { .. } => ErrorCode::InvalidFieldValue,
            TaskError::NoStableId(_) => ErrorCode::MissingStableId,
            TaskError::CircularDependency { .. } => ErrorCode::DependencyCycle,
            TaskError::LimitExceeded(_) => ErrorCode::LimitExceeded,
            TaskError::StableIdExhausted | TaskError::Json(_) => ErrorCode::InternalError,
            TaskError::Io(_) => ErrorCode::IoError,
        }
    }

    /// Serialisable `{code, message}` view for collaborators.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
            line: match self {
                TaskError::Parse(err) => err.line(),
                _ => None,
            },
        }
    }
}

/// Structured error for JSON responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Non-fatal condition reported alongside a successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "taskId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

pub const WARN_DEPENDENTS_REMOVED: &str = "dependents_removed";

/// Result type for engine operations.
pub type TaskResult<T> = std::result::Result<T, TaskError>;
