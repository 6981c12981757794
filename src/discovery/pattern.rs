//! Source path patterns.
//!
//! A pattern is a glob relative to the project root which may contain a
//! single `:name` segment. Files matching the pattern are grouped by the
//! value captured at `:name`, and each group becomes one sprite.
//!
//! Supported syntax:
//!
//! - `*` matches within a single path segment
//! - `**` matches any number of directories (including none)
//! - `?` matches a single character within a segment
//! - `{png,jpg}` matches any of the comma separated alternatives
//! - `:name` captures one path segment (or part of one)
//!
//! Only the first `:name` captures. Callers must not pass patterns with
//! more than one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{MontageError, Result};

/// The token which captures a sprite name.
pub const NAME_TOKEN: &str = ":name";

const CAPTURE_GROUP: &str = "name";

/// Discovered files, grouped by captured name.
///
/// Patterns without a `:name` capture put every file under `None`.
pub type SourceGroups = BTreeMap<Option<String>, Vec<PathBuf>>;

/// A compiled source pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    regex: Regex,
    has_capture: bool,
    /// Leading directories which contain no wildcards; the walk starts here.
    base: PathBuf,
    /// Maximum walk depth below `base`, or `None` when the pattern has `**`.
    depth: Option<usize>,
}

impl Pattern {
    /// Compile a raw pattern string.
    pub fn compile(raw: &str) -> Result<Self> {
        let trimmed = raw.strip_prefix("./").unwrap_or(raw);
        let (expr, has_capture) = translate(trimmed).map_err(|message| MontageError::Parse {
            message: format!("Invalid sprite pattern `{}`: {}", raw, message),
            help: Some("Patterns support *, **, ?, {a,b} and a single :name".to_string()),
        })?;

        let regex = Regex::new(&expr).map_err(|e| MontageError::Parse {
            message: format!("Invalid sprite pattern `{}`: {}", raw, e),
            help: None,
        })?;

        let segments: Vec<&str> = trimmed.split('/').collect();
        let (dirs, _file) = segments.split_at(segments.len().saturating_sub(1));
        let literal = dirs.iter().take_while(|s| is_literal(s)).count();

        let base: PathBuf = dirs[..literal].iter().collect();
        let depth = if trimmed.contains("**") {
            None
        } else {
            Some(segments.len() - literal)
        };

        Ok(Self {
            raw: raw.to_string(),
            regex,
            has_capture,
            base,
            depth,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern contains a `:name` capture.
    pub fn has_capture(&self) -> bool {
        self.has_capture
    }

    /// Match a path (relative to the project root, `/` separated).
    ///
    /// Returns `None` when the path does not match, otherwise the captured
    /// name, if any.
    pub fn capture<'p>(&self, relative: &'p str) -> Option<Option<&'p str>> {
        let captures = self.regex.captures(relative)?;
        Some(captures.name(CAPTURE_GROUP).map(|m| m.as_str()))
    }

    /// Check whether `path` is matched by this pattern.
    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.capture(&to_slash(relative)).is_some()
    }

    /// Find every file below `root` matching the pattern, grouped by the
    /// captured name.
    ///
    /// Files within a group are sorted by path so that sprite digests do not
    /// depend on the order in which the file system lists directories.
    pub fn matching_sources(&self, root: &Path) -> SourceGroups {
        let mut groups = SourceGroups::new();
        let start = root.join(&self.base);

        if !start.is_dir() {
            tracing::debug!(pattern = %self.raw, dir = %start.display(), "pattern base does not exist");
            return groups;
        }

        let mut walker = WalkDir::new(&start).follow_links(true);
        if let Some(depth) = self.depth {
            walker = walker.max_depth(depth);
        }

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);

            if let Some(name) = self.capture(&to_slash(relative)) {
                groups
                    .entry(name.map(str::to_string))
                    .or_default()
                    .push(path.to_path_buf());
            }
        }

        for files in groups.values_mut() {
            files.sort();
        }

        groups
    }

    /// The distinct names captured by this pattern below `root`.
    ///
    /// Returns `None` if the pattern has no `:name` capture.
    pub fn sprite_names(&self, root: &Path) -> Option<BTreeSet<String>> {
        if !self.has_capture {
            return None;
        }

        Some(self.matching_sources(root).into_keys().flatten().collect())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Translate a glob into an anchored regular expression.
fn translate(pattern: &str) -> std::result::Result<(String, bool), String> {
    let mut expr = String::from("^");
    let mut has_capture = false;
    let mut depth = 0usize;
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix(NAME_TOKEN) {
            if has_capture {
                expr.push_str("[^/]+");
            } else {
                expr.push_str(&format!("(?P<{}>[^/]+)", CAPTURE_GROUP));
                has_capture = true;
            }
            rest = after;
            continue;
        }

        if let Some(after) = rest.strip_prefix("**/") {
            expr.push_str("(?:.*/)?");
            rest = after;
            continue;
        }

        if let Some(after) = rest.strip_prefix("**") {
            expr.push_str(".*");
            rest = after;
            continue;
        }

        match c {
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            '{' => {
                depth += 1;
                expr.push_str("(?:");
            }
            '}' if depth > 0 => {
                depth -= 1;
                expr.push(')');
            }
            ',' if depth > 0 => expr.push('|'),
            _ => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }

        rest = &rest[c.len_utf8()..];
    }

    if depth > 0 {
        return Err("unclosed `{`".to_string());
    }

    expr.push('$');
    Ok((expr, has_capture))
}

fn is_literal(segment: &str) -> bool {
    !segment.contains(['*', '?', '{']) && !segment.contains(NAME_TOKEN)
}

/// Render a path with `/` separators for matching.
pub(crate) fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
