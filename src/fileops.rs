//! Reading and writing task documents on disk.

use crate::config::Limits;
use crate::error::TaskResult;
use crate::parse;
use crate::render;
use crate::types::{Document, TaskList};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read and parse a file, dropping phase markers.
pub fn parse_file(path: impl AsRef<Path>) -> TaskResult<TaskList> {
    Ok(parse_file_with_phases(path)?.list)
}

pub fn parse_file_with_phases(path: impl AsRef<Path>) -> TaskResult<Document> {
    parse_file_with_limits(path, &Limits::default())
}

pub fn parse_file_with_limits(path: impl AsRef<Path>, limits: &Limits) -> TaskResult<Document> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = content.len(), "read task file");
    Ok(parse::parse_with_limits(&content, limits)?)
}

/// Write a task list with no phase headings.
pub fn write_file(list: &TaskList, path: impl AsRef<Path>) -> TaskResult<()> {
    write_atomic(path.as_ref(), &render::render_list(list))
}

/// Write a document with its phase headings.
pub fn write_document(doc: &Document, path: impl AsRef<Path>) -> TaskResult<()> {
    write_atomic(path.as_ref(), &render::render(doc))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write through a sibling temp file and rename over the target, keeping the
/// target's permissions if it already exists.
fn write_atomic(path: &Path, content: &str) -> TaskResult<()> {
    let tmp = temp_path(path);
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let result = fs::write(&tmp, content)
        .and_then(|()| match permissions {
            Some(permissions) => fs::set_permissions(&tmp, permissions),
            None => Ok(()),
        })
        .and_then(|()| fs::rename(&tmp, path));
    if let Err(err) = result {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }

    info!(path = %path.display(), bytes = content.len(), "wrote task file");
    Ok(())
}
