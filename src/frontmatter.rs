//! YAML front matter: splitting it from the body, parsing and serializing it.

use crate::error::{ParseError, TaskError, TaskResult};
use crate::types::FrontMatter;
use regex_lite::Regex;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::sync::LazyLock;
use tracing::warn;

const DELIMITER: &str = "---";

static METADATA_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"));

#[derive(Debug, Default, Deserialize)]
struct RawFrontMatter {
    #[serde(default)]
    references: Vec<String>,
    #[serde(default)]
    metadata: Mapping,
}

/// Result of splitting a document into front matter and body.
#[derive(Debug)]
pub struct Split<'a> {
    pub front_matter: FrontMatter,
    pub body: &'a str,
    /// Lines consumed by the front matter block, including both delimiters.
    pub line_offset: usize,
}

/// Separate a leading `---` block from the rest of the document.
///
/// Content not starting with a delimiter line has no front matter.
pub fn split(content: &str) -> Result<Split<'_>, ParseError> {
    let Some(rest) = content.strip_prefix("---\n") else {
        return Ok(Split {
            front_matter: FrontMatter::default(),
            body: content,
            line_offset: 0,
        });
    };

    let mut offset = 0;
    let mut consumed = 1;
    for line in rest.split_inclusive('\n') {
        consumed += 1;
        if line.trim_end() == DELIMITER {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok(Split {
                front_matter: parse_yaml(yaml)?,
                body,
                line_offset: consumed,
            });
        }
        offset += line.len();
    }

    Err(ParseError::UnclosedFrontMatter)
}

fn parse_yaml(yaml: &str) -> Result<FrontMatter, ParseError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }

    let raw: Option<RawFrontMatter> =
        serde_yaml::from_str(yaml).map_err(|e| ParseError::FrontMatter {
            message: e.to_string(),
        })?;
    let raw = raw.unwrap_or_default();

    let mut metadata = Vec::with_capacity(raw.metadata.len());
    for (key, value) in raw.metadata {
        let key = scalar_to_string(&key).ok_or_else(|| ParseError::FrontMatter {
            message: "metadata keys must be scalars".to_string(),
        })?;
        let value = scalar_to_string(&value).ok_or_else(|| ParseError::FrontMatter {
            message: format!("nested metadata values are not supported: {key}"),
        })?;
        metadata.push((key, value));
    }

    Ok(FrontMatter {
        references: raw.references,
        metadata,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

/// Render front matter as a delimited YAML block; empty front matter renders
/// as nothing.
pub fn serialize(front_matter: &FrontMatter) -> String {
    if front_matter.is_empty() {
        return String::new();
    }
    match serde_yaml::to_string(front_matter) {
        Ok(yaml) => format!("{DELIMITER}\n{yaml}{DELIMITER}\n"),
        Err(e) => {
            warn!(error = %e, "failed to serialize front matter, omitting it");
            String::new()
        }
    }
}

/// Parse `key:value` flags. Splits on the first colon so values may contain
/// colons; a repeated key keeps its last value.
pub fn parse_metadata_flags<S: AsRef<str>>(flags: &[S]) -> TaskResult<Vec<(String, String)>> {
    let mut result = FrontMatter::default();
    for flag in flags {
        let flag = flag.as_ref();
        if flag.is_empty() {
            return Err(TaskError::invalid("metadata", "empty metadata flag"));
        }
        let Some((key, value)) = flag.split_once(':') else {
            return Err(TaskError::invalid(
                "metadata",
                format!("invalid metadata format: {flag} (expected key:value)"),
            ));
        };
        validate_metadata_key(key)?;
        result.set(key, value);
    }
    Ok(result.metadata)
}

pub fn validate_metadata_key(key: &str) -> TaskResult<()> {
    if key.is_empty() {
        return Err(TaskError::invalid("metadata", "empty metadata key"));
    }
    if key.contains('.') {
        return Err(TaskError::invalid(
            "metadata",
            format!("nested keys not supported: {key}"),
        ));
    }
    if !METADATA_KEY.is_match(key) {
        return Err(TaskError::invalid(
            "metadata",
            format!(
                "invalid key {key:?}: must start with letter or underscore, followed by letters, numbers, or underscores"
            ),
        ));
    }
    Ok(())
}

impl FrontMatter {
    /// Append references (duplicates kept) and upsert metadata.
    pub fn merge(&mut self, references: &[String], metadata: &[(String, String)]) {
        self.references.extend(references.iter().cloned());
        for (key, value) in metadata {
            self.set(key.clone(), value.clone());
        }
    }
}
