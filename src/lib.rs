//! Markdown task-list engine.
//!
//! Parses a constrained markdown dialect of hierarchical checkbox tasks into a
//! typed tree, mutates it while keeping hierarchical IDs dense, answers
//! dependency and stream questions for multi-agent work, and renders it back
//! so that `parse(render(doc)) == doc`.
//!
//! ```
//! use tasks_md::{parse, render, InsertOptions};
//!
//! let mut doc = parse("# Plan\n\n- [ ] 1. Design\n").unwrap();
//! doc.insert("", "Urgent", Some("1"), &InsertOptions::default()).unwrap();
//! assert_eq!(doc.list.find_task("2").unwrap().title, "Design");
//! assert_eq!(parse(&render(&doc)).unwrap(), doc);
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod fileops;
pub mod format;
pub mod frontmatter;
pub mod graph;
pub mod ids;
pub mod logging;
pub mod ops;
pub mod parse;
pub mod query;
pub mod render;
pub mod types;

pub use batch::{BatchResponse, Operation, execute_batch};
pub use error::{ErrorCode, ParseError, TaskError, TaskResult, Warning};
pub use fileops::{parse_file, parse_file_with_phases, write_document, write_file};
pub use graph::{DependencyIndex, StreamsResult, analyze_streams, ready_tasks};
pub use ops::{ClaimScope, InsertOptions, UpdateFields};
pub use parse::{parse, parse_markdown};
pub use render::{render, render_tasks};
pub use types::{Document, FrontMatter, PhaseMarker, Stats, Status, Task, TaskList};
