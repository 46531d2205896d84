//! Hierarchical and stable task identifiers.

use crate::error::{TaskError, TaskResult};
use rand::Rng;
use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static HIERARCHICAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d*(\.[1-9]\d*)*$").expect("static pattern"));

static STABLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]{7}$").expect("static pattern"));

/// Length of a stable ID.
pub const STABLE_ID_LEN: usize = 7;

/// Largest value representable in seven base36 digits ("zzzzzzz").
const MAX_STABLE_VALUE: u64 = 36u64.pow(STABLE_ID_LEN as u32) - 1;

const MAX_GENERATE_ATTEMPTS: usize = 1000;

/// True if `id` is a dot-separated sequence of positive integers.
pub fn is_valid_id(id: &str) -> bool {
    HIERARCHICAL_ID.is_match(id)
}

/// True if `id` is exactly seven lowercase alphanumerics.
pub fn is_valid_stable_id(id: &str) -> bool {
    STABLE_ID.is_match(id)
}

/// Zero-based index path for a hierarchical ID ("2.1" -> [1, 0]).
pub fn index_path(id: &str) -> Option<Vec<usize>> {
    if !is_valid_id(id) {
        return None;
    }
    id.split('.')
        .map(|seg| seg.parse::<usize>().ok().map(|n| n - 1))
        .collect()
}

pub fn parent_id(id: &str) -> Option<&str> {
    id.rsplit_once('.').map(|(parent, _)| parent)
}

/// Number of segments; 0 for the empty (root) ID.
pub fn level(id: &str) -> usize {
    if id.is_empty() {
        0
    } else {
        id.split('.').count()
    }
}

/// ID of the `n`th (1-based) child of `parent`; top-level when `parent` is empty.
pub fn child_id(parent: &str, n: usize) -> String {
    if parent.is_empty() {
        n.to_string()
    } else {
        format!("{parent}.{n}")
    }
}

/// Last segment of an ID as a 1-based sibling index.
pub fn last_segment(id: &str) -> Option<usize> {
    id.rsplit('.').next()?.parse().ok()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = [b'0'; STABLE_ID_LEN];
    for slot in buf.iter_mut().rev() {
        *slot = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    buf.iter().map(|&b| b as char).collect()
}

/// Generates unique seven-character base36 stable IDs.
///
/// Seeded from the highest existing ID so new IDs sort after old ones; a
/// document without IDs starts from a random point in the space.
#[derive(Debug, Clone)]
pub struct StableIdGenerator {
    used: HashSet<String>,
    counter: u64,
}

impl StableIdGenerator {
    pub fn new<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let mut used = HashSet::new();
        let mut max_value = 0;
        for id in existing {
            if let Ok(value) = u64::from_str_radix(id, 36) {
                max_value = max_value.max(value);
            }
            used.insert(id.to_string());
        }

        let counter = if max_value > 0 {
            max_value
        } else {
            rand::thread_rng().gen_range(0..MAX_STABLE_VALUE / 2)
        };

        Self { used, counter }
    }

    pub fn generate(&mut self) -> TaskResult<String> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            self.counter += 1;
            if self.counter > MAX_STABLE_VALUE {
                return Err(TaskError::StableIdExhausted);
            }
            let id = to_base36(self.counter);
            if self.used.insert(id.clone()) {
                return Ok(id);
            }
        }
        Err(TaskError::StableIdExhausted)
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }
}
