//! Markdown task-list parser.
//!
//! The dialect:
//!
//! ```text
//! ---
//! references: [docs/design.md]
//! ---
//! # Title
//!
//! ## Phase name
//!
//! - [ ] 1. Task title <!-- id:abc1234 -->
//!   - Free-form detail
//!   - Requirements: [1.1](requirements.md#1.1)
//!   - References: docs/a.md, docs/b.md
//!   - Stream: 2
//!   - Owner: agent-1
//!   - Blocked-by: def5678 (Other task)
//!   - [-] 1.1. Subtask
//! ```
//!
//! Nesting is two spaces per level. The number written on a task line only
//! has to agree with its depth; IDs are reassigned from position.

use crate::config::Limits;
use crate::error::ParseError;
use crate::frontmatter;
use crate::ids::{self, STABLE_ID_LEN};
use crate::types::{DEFAULT_REQUIREMENTS_FILE, Document, PhaseMarker, Status, Task, TaskList};
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static TASK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- (\[[ \-xX]\]) (\d+(?:\.\d+)*)\. (.+)$").expect("static pattern")
});

static CHECKBOX_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[[ \-xX]\] \d").expect("static pattern"));

static CHECKBOX_NO_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[[ \-xX]\][^\d]").expect("static pattern"));

static CHECKBOX_NO_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[[ \-xX]\]\d").expect("static pattern"));

pub(crate) static STABLE_ID_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*id:([a-z0-9]{7})\s*-->").expect("static pattern"));

static REQUIREMENT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\(([^#)]+)#[^)]+\)$").expect("static pattern"));

/// Parse a document with default limits.
pub fn parse(content: &str) -> Result<Document, ParseError> {
    parse_with_limits(content, &Limits::default())
}

/// Parse a document, returning tasks and phase markers.
pub fn parse_with_limits(content: &str, limits: &Limits) -> Result<Document, ParseError> {
    if content.len() > limits.max_file_size {
        return Err(ParseError::FileTooLarge {
            limit: limits.max_file_size,
        });
    }

    let normalized = content.replace("\r\n", "\n");
    let split = frontmatter::split(&normalized)?;

    let mut parser = Parser {
        max_depth: limits.max_depth,
        max_tasks: limits.max_tasks,
        ..Parser::default()
    };
    parser.list.front_matter = split.front_matter;
    for (i, line) in split.body.lines().enumerate() {
        parser.feed(line, split.line_offset + i + 1)?;
    }
    let doc = parser.finish()?;

    debug!(
        tasks = doc.list.count(),
        phases = doc.phases.len(),
        "parsed task document"
    );
    Ok(doc)
}

/// Parse a document and drop its phase markers.
pub fn parse_markdown(content: &str) -> Result<TaskList, ParseError> {
    Ok(parse(content)?.list)
}

#[derive(Default)]
struct Parser {
    list: TaskList,
    phases: Vec<PhaseMarker>,
    /// Index path of the innermost open task at each depth.
    open: Vec<usize>,
    title_seen: bool,
    /// Blocked-by references to verify once every task is known.
    blockers: Vec<(usize, String)>,
    stable_ids: HashMap<String, usize>,
    requirements_file: Option<String>,
    task_count: usize,
    max_depth: usize,
    max_tasks: usize,
}

impl Parser {
    fn feed(&mut self, line: &str, n: usize) -> Result<(), ParseError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        if !self.title_seen && (trimmed == "#" || trimmed.starts_with("# ")) {
            self.list.title = trimmed[1..].trim().to_string();
            self.title_seen = true;
            return Ok(());
        }

        let content = line.trim_start_matches([' ', '\t']);
        let indent = &line[..line.len() - content.len()];
        if indent.contains('\t') {
            return Err(ParseError::TabIndentation { line: n });
        }
        if indent.len() % 2 != 0 {
            return Err(ParseError::OddIndentation { line: n });
        }
        let depth = indent.len() / 2;

        if depth == 0 {
            if let Some(name) = content.strip_prefix("## ") {
                return self.phase(name.trim(), n);
            }
        }

        if let Some(task_line) = parse_task_line(content, n)? {
            return self.task(task_line, depth, n);
        }

        if let Some(text) = content.strip_prefix("- ") {
            return self.continuation(text.trim(), depth, n);
        }

        Err(ParseError::UnexpectedContent { line: n })
    }

    fn phase(&mut self, name: &str, n: usize) -> Result<(), ParseError> {
        if name.is_empty() {
            return Err(ParseError::UnexpectedContent { line: n });
        }
        self.open.clear();
        self.phases
            .push(PhaseMarker::new(name, self.list.tasks.len()));
        Ok(())
    }

    fn task(&mut self, line: TaskLine, depth: usize, n: usize) -> Result<(), ParseError> {
        if depth > self.open.len() {
            return Err(ParseError::SkippedDepth {
                line: n,
                expected: self.open.len(),
                found: depth,
            });
        }
        if depth >= self.max_depth {
            return Err(ParseError::TooDeep {
                line: n,
                limit: self.max_depth,
            });
        }
        self.task_count += 1;
        if self.task_count > self.max_tasks {
            return Err(ParseError::TooManyTasks {
                line: n,
                limit: self.max_tasks,
            });
        }
        if ids::level(&line.number) != depth + 1 {
            return Err(ParseError::DepthMismatch {
                line: n,
                id: line.number,
                depth,
            });
        }
        if let Some(stable_id) = &line.stable_id {
            if self.stable_ids.insert(stable_id.clone(), n).is_some() {
                return Err(ParseError::DuplicateStableId {
                    line: n,
                    stable_id: stable_id.clone(),
                });
            }
        }

        let mut task = Task::new(line.title);
        task.status = line.status;
        task.stable_id = line.stable_id;

        self.open.truncate(depth);
        let siblings = if self.open.is_empty() {
            &mut self.list.tasks
        } else {
            &mut self
                .list
                .task_at_path_mut(&self.open)
                .ok_or(ParseError::UnexpectedContent { line: n })?
                .children
        };
        siblings.push(task);
        let index = siblings.len() - 1;
        self.open.push(index);
        Ok(())
    }

    fn continuation(&mut self, text: &str, depth: usize, n: usize) -> Result<(), ParseError> {
        // Continuation lines sit one level below their task
        if depth == 0 || depth > self.open.len() {
            return Err(ParseError::UnexpectedContent { line: n });
        }
        if text.is_empty() {
            return Ok(());
        }
        self.open.truncate(depth);

        let metadata = classify(text);
        let task = self
            .list
            .task_at_path_mut(&self.open)
            .ok_or(ParseError::UnexpectedContent { line: n })?;

        match metadata {
            Continuation::BlockedBy(stable_ids) => {
                for id in stable_ids {
                    if !task.blocked_by.contains(&id) {
                        task.blocked_by.push(id.clone());
                    }
                    self.blockers.push((n, id));
                }
            }
            Continuation::MalformedBlockedBy => {
                return Err(ParseError::InvalidMetadata {
                    line: n,
                    field: "blocked-by",
                });
            }
            Continuation::Stream(stream) => task.stream = stream,
            Continuation::Owner(owner) => task.owner = Some(owner.to_string()),
            Continuation::Requirements { ids, file } => {
                task.requirements.extend(ids);
                if self.requirements_file.is_none() {
                    self.requirements_file = Some(file);
                }
            }
            Continuation::References(refs) => task.references.extend(refs),
            Continuation::Detail => task.details.push(text.to_string()),
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Document, ParseError> {
        for (line, stable_id) in self.blockers {
            if !self.stable_ids.contains_key(&stable_id) {
                return Err(ParseError::UnknownBlocker { line, stable_id });
            }
        }

        self.list.requirements_file = self
            .requirements_file
            .unwrap_or_else(|| DEFAULT_REQUIREMENTS_FILE.to_string());
        self.list.renumber();
        Ok(Document::from_parts(self.list, self.phases))
    }
}

/// A recognised task line before it is placed in the tree.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TaskLine {
    pub status: Status,
    pub number: String,
    pub title: String,
    pub stable_id: Option<String>,
}

/// Recognise a task line with its indentation already stripped.
///
/// `Ok(None)` means the line is not a task line at all; lines that look like
/// a checkbox but are malformed are errors.
pub(crate) fn parse_task_line(content: &str, n: usize) -> Result<Option<TaskLine>, ParseError> {
    if content.starts_with("- []") || content.starts_with("-[]") {
        return Err(invalid_format(n, "missing space in checkbox"));
    }
    if !content.starts_with("- [") || !content.contains(']') {
        return Ok(None);
    }

    let Some(caps) = TASK_LINE.captures(content) else {
        if let Some(close) = content.find(']') {
            let marker = &content[2..=close];
            if Status::from_marker(marker).is_none() {
                return Err(ParseError::InvalidStatus {
                    line: n,
                    marker: marker.to_string(),
                });
            }
        }
        if !CHECKBOX_NUMBER.is_match(content) {
            if CHECKBOX_NO_SPACE.is_match(content) {
                return Err(invalid_format(n, "missing space after checkbox"));
            }
            if CHECKBOX_NO_NUMBER.is_match(content) {
                return Err(invalid_format(n, "missing task number"));
            }
        }
        return Err(invalid_format(n, "expected '- [ ] N. Title'"));
    };

    let status = Status::from_marker(&caps[1]).ok_or_else(|| ParseError::InvalidStatus {
        line: n,
        marker: caps[1].to_string(),
    })?;

    let raw_title = &caps[3];
    let stable_id = STABLE_ID_COMMENT
        .captures(raw_title)
        .map(|c| c[1].to_string());
    let title = STABLE_ID_COMMENT.replace_all(raw_title, "").trim().to_string();
    if title.is_empty() {
        return Err(invalid_format(n, "missing title"));
    }

    Ok(Some(TaskLine {
        status,
        number: caps[2].to_string(),
        title,
        stable_id,
    }))
}

fn invalid_format(line: usize, reason: &str) -> ParseError {
    ParseError::InvalidTaskFormat {
        line,
        reason: reason.to_string(),
    }
}

/// Meaning of a continuation line under a task.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Continuation<'a> {
    BlockedBy(Vec<String>),
    MalformedBlockedBy,
    Stream(u32),
    Owner(&'a str),
    Requirements { ids: Vec<String>, file: String },
    References(Vec<String>),
    Detail,
}

/// Classify continuation text (after the leading `- `). Keys are
/// case-insensitive; lines that name a key but carry no usable value are
/// plain details, except Blocked-by which must scan.
pub(crate) fn classify(text: &str) -> Continuation<'_> {
    if let Some(value) = strip_key(text, "blocked-by") {
        return match scan_blockers(value) {
            Some(ids) => Continuation::BlockedBy(ids),
            None => Continuation::MalformedBlockedBy,
        };
    }
    if let Some(value) = strip_key(text, "stream") {
        let digits = !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit());
        return match value.parse::<u32>() {
            Ok(stream) if digits && stream > 0 => Continuation::Stream(stream),
            _ => Continuation::Detail,
        };
    }
    if let Some(value) = strip_key(text, "owner") {
        if !value.is_empty() {
            return Continuation::Owner(value);
        }
        return Continuation::Detail;
    }
    if let Some(value) = strip_key(text, "requirements") {
        let mut ids = Vec::new();
        let mut file = None;
        for part in value.split(',') {
            if let Some(caps) = REQUIREMENT_LINK.captures(part.trim()) {
                let id = caps[1].trim();
                if ids::is_valid_id(id) {
                    ids.push(id.to_string());
                    file.get_or_insert_with(|| caps[2].to_string());
                }
            }
        }
        return match file {
            Some(file) if !ids.is_empty() => Continuation::Requirements { ids, file },
            _ => Continuation::Detail,
        };
    }
    if let Some(value) = strip_key(text, "references") {
        let refs: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();
        if refs.is_empty() {
            return Continuation::Detail;
        }
        return Continuation::References(refs);
    }
    Continuation::Detail
}

fn strip_key<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let head = text.get(..key.len())?;
    if !head.eq_ignore_ascii_case(key) {
        return None;
    }
    text[key.len()..].strip_prefix(':').map(str::trim)
}

/// Scan `id (hint), id (hint), ...`. Hints are optional and may contain
/// commas; parentheses inside a hint must balance.
pub(crate) fn scan_blockers(value: &str) -> Option<Vec<String>> {
    let mut rest = value.trim();
    if rest.is_empty() {
        return None;
    }

    let mut found: Vec<String> = Vec::new();
    loop {
        let id = rest.get(..STABLE_ID_LEN)?;
        if !ids::is_valid_stable_id(id) {
            return None;
        }
        rest = rest[STABLE_ID_LEN..].trim_start();

        if let Some(after) = rest.strip_prefix('(') {
            let close = matching_paren(after)?;
            rest = after[close + 1..].trim_start();
        }

        if !found.iter().any(|f| f == id) {
            found.push(id.to_string());
        }

        if rest.is_empty() {
            return Some(found);
        }
        rest = rest.strip_prefix(',')?.trim_start();
        if rest.is_empty() {
            return None;
        }
    }
}

fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Project Tasks

- [x] 1. Set up repository <!-- id:0000001 -->
  - Initialise git
  - References: docs/setup.md, README.md
  - [x] 1.1. Create remote <!-- id:0000002 -->

- [-] 2. Build parser <!-- id:0000003 -->
  - Requirements: [1.1](specs.md#1.1), [2.3](specs.md#2.3)
  - Stream: 2
  - Owner: agent-7
  - Blocked-by: 0000001 (Set up repository)
  - [ ] 2.1. Tokenizer <!-- id:0000004 -->
    - Handles CRLF
";

    #[test]
    fn test_parse_full_sample() {
        let doc = parse(SAMPLE).unwrap();
        let list = &doc.list;
        assert_eq!(list.title, "Project Tasks");
        assert_eq!(list.tasks.len(), 2);
        assert_eq!(list.requirements_file, "specs.md");

        let first = &list.tasks[0];
        assert_eq!(first.status, Status::Completed);
        assert_eq!(first.stable_id.as_deref(), Some("0000001"));
        assert_eq!(first.details, vec!["Initialise git"]);
        assert_eq!(first.references, vec!["docs/setup.md", "README.md"]);
        assert_eq!(first.children[0].id, "1.1");

        let second = &list.tasks[1];
        assert_eq!(second.status, Status::InProgress);
        assert_eq!(second.requirements, vec!["1.1", "2.3"]);
        assert_eq!(second.stream, 2);
        assert_eq!(second.owner.as_deref(), Some("agent-7"));
        assert_eq!(second.blocked_by, vec!["0000001"]);
        assert_eq!(second.children[0].details, vec!["Handles CRLF"]);
    }

    #[test]
    fn test_written_numbers_are_cosmetic() {
        let doc = parse("# T\n\n- [ ] 5. A\n  - [ ] 5.9. B\n- [ ] 3. C\n").unwrap();
        let ids: Vec<&str> = doc.list.walk().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1.1", "2"]);
    }

    #[test]
    fn test_crlf_input() {
        let doc = parse("# T\r\n\r\n- [ ] 1. A\r\n  - detail\r\n").unwrap();
        assert_eq!(doc.list.tasks[0].title, "A");
        assert_eq!(doc.list.tasks[0].details, vec!["detail"]);
    }

    #[test]
    fn test_phase_markers() {
        let doc = parse("# T\n\n## Alpha\n\n- [ ] 1. A\n\n- [ ] 2. B\n\n## Beta\n\n- [ ] 3. C\n\n## Empty\n").unwrap();
        assert_eq!(
            doc.phases,
            vec![
                PhaseMarker::new("Alpha", 0),
                PhaseMarker::new("Beta", 2),
                PhaseMarker::new("Empty", 3)
            ]
        );
    }

    #[test]
    fn test_metadata_keys_case_insensitive() {
        let doc = parse("# T\n\n- [ ] 1. A\n  - stream: 3\n  - OWNER: bob\n").unwrap();
        assert_eq!(doc.list.tasks[0].stream, 3);
        assert_eq!(doc.list.tasks[0].owner.as_deref(), Some("bob"));
    }

    #[test]
    fn test_invalid_stream_value_is_detail() {
        let doc = parse("# T\n\n- [ ] 1. A\n  - Stream: zero\n  - Stream: 0\n").unwrap();
        assert_eq!(doc.list.tasks[0].stream, 0);
        assert_eq!(doc.list.tasks[0].details, vec!["Stream: zero", "Stream: 0"]);
    }

    mod errors {
        use super::*;

        fn err(content: &str) -> ParseError {
            parse(content).unwrap_err()
        }

        #[test]
        fn invalid_status_glyph() {
            assert_eq!(
                err("# T\n\n- [?] 1. A\n"),
                ParseError::InvalidStatus {
                    line: 3,
                    marker: "[?]".to_string()
                }
            );
        }

        #[test]
        fn missing_number() {
            assert!(matches!(
                err("# T\n- [ ] Task\n"),
                ParseError::InvalidTaskFormat { line: 2, .. }
            ));
        }

        #[test]
        fn tab_indentation() {
            assert_eq!(
                err("# T\n- [ ] 1. A\n\t- [ ] 1.1. B\n"),
                ParseError::TabIndentation { line: 3 }
            );
        }

        #[test]
        fn odd_indentation() {
            assert_eq!(
                err("# T\n- [ ] 1. A\n   - detail\n"),
                ParseError::OddIndentation { line: 3 }
            );
        }

        #[test]
        fn skipped_depth() {
            assert_eq!(
                err("# T\n- [ ] 1. A\n    - [ ] 1.1.1. Deep\n"),
                ParseError::SkippedDepth {
                    line: 3,
                    expected: 1,
                    found: 2
                }
            );
        }

        #[test]
        fn number_disagrees_with_depth() {
            assert!(matches!(
                err("# T\n- [ ] 1. A\n  - [ ] 2. B\n"),
                ParseError::DepthMismatch { line: 3, .. }
            ));
        }

        #[test]
        fn unknown_blocker() {
            assert_eq!(
                err("# T\n- [ ] 1. A <!-- id:0000001 -->\n  - Blocked-by: 0000009\n"),
                ParseError::UnknownBlocker {
                    line: 3,
                    stable_id: "0000009".to_string()
                }
            );
        }

        #[test]
        fn forward_blocker_reference_is_fine() {
            let doc = parse(
                "# T\n- [ ] 1. A <!-- id:0000001 -->\n  - Blocked-by: 0000002 (B)\n- [ ] 2. B <!-- id:0000002 -->\n",
            )
            .unwrap();
            assert_eq!(doc.list.tasks[0].blocked_by, vec!["0000002"]);
        }

        #[test]
        fn malformed_blocked_by() {
            assert_eq!(
                err("# T\n- [ ] 1. A\n  - Blocked-by: nope\n"),
                ParseError::InvalidMetadata {
                    line: 3,
                    field: "blocked-by"
                }
            );
        }

        #[test]
        fn duplicate_stable_id() {
            assert!(matches!(
                err("# T\n- [ ] 1. A <!-- id:0000001 -->\n- [ ] 2. B <!-- id:0000001 -->\n"),
                ParseError::DuplicateStableId { line: 3, .. }
            ));
        }

        #[test]
        fn stray_text() {
            assert_eq!(
                err("# T\nJust some prose\n"),
                ParseError::UnexpectedContent { line: 2 }
            );
            assert_eq!(
                err("# T\n- top-level detail\n"),
                ParseError::UnexpectedContent { line: 2 }
            );
        }

        #[test]
        fn line_numbers_account_for_front_matter() {
            assert_eq!(
                err("---\nreferences:\n  - a.md\n---\n# T\n- [?] 1. A\n"),
                ParseError::InvalidStatus {
                    line: 6,
                    marker: "[?]".to_string()
                }
            );
        }

        #[test]
        fn depth_and_task_limits() {
            let shallow = Limits {
                max_depth: 2,
                ..Limits::default()
            };
            let nested = "# T\n\n- [ ] 1. A\n  - [ ] 1.1. B\n    - [ ] 1.1.1. C\n";
            assert_eq!(
                parse_with_limits(nested, &shallow).unwrap_err(),
                ParseError::TooDeep { line: 5, limit: 2 }
            );
            assert!(parse_with_limits("# T\n\n- [ ] 1. A\n  - [ ] 1.1. B\n", &shallow).is_ok());

            let few = Limits {
                max_tasks: 2,
                ..Limits::default()
            };
            assert_eq!(
                parse_with_limits(nested, &few).unwrap_err(),
                ParseError::TooManyTasks { line: 5, limit: 2 }
            );
        }

        #[test]
        fn file_too_large() {
            let limits = Limits {
                max_file_size: 8,
                ..Limits::default()
            };
            assert_eq!(
                parse_with_limits("# A longer title\n", &limits).unwrap_err(),
                ParseError::FileTooLarge { limit: 8 }
            );
        }
    }

    #[test]
    fn test_scan_blockers() {
        assert_eq!(
            scan_blockers("abc1234 (Setup, part 1), def5678"),
            Some(vec!["abc1234".to_string(), "def5678".to_string()])
        );
        assert_eq!(scan_blockers("abc1234"), Some(vec!["abc1234".to_string()]));
        assert_eq!(scan_blockers("abc12345"), None);
        assert_eq!(scan_blockers("abc1234,"), None);
        assert_eq!(scan_blockers("abc1234 (unclosed"), None);
        assert_eq!(scan_blockers(""), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("Stream: 4"), Continuation::Stream(4));
        assert_eq!(classify("Owner:   alice "), Continuation::Owner("alice"));
        assert_eq!(classify("Ownership matters"), Continuation::Detail);
        assert_eq!(
            classify("References: a.md"),
            Continuation::References(vec!["a.md".to_string()])
        );
        assert_eq!(classify("References:"), Continuation::Detail);
        assert_eq!(classify("Requirements: none yet"), Continuation::Detail);
        assert_eq!(classify("Blocked-by: ???"), Continuation::MalformedBlockedBy);
    }
}
