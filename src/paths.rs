// ABOUTME: Path validation helpers for the stagdeck library
// ABOUTME: Guards theme and asset paths against traversal and shell injection before touching disk

use crate::errors::{DeckError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

lazy_static! {
    static ref SHELL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"[;&|`$(){}<>]").unwrap(),
        Regex::new(r"\$\(").unwrap(),
        Regex::new(r"\$\{").unwrap(),
        Regex::new(r"\\[nr]").unwrap(),
    ];
    static ref UNSAFE_FILENAME_CHARS: Regex =
        Regex::new(r#"[;&|`$<>(){}\[\]!#*?"'/\\]"#).unwrap();
}

/// Reject strings that carry shell metacharacters or control escapes.
fn check_shell_injection(value: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(DeckError::PathSecurityError(format!(
            "Null byte in path: {:?}",
            value
        )));
    }
    for pattern in SHELL_PATTERNS.iter() {
        if pattern.is_match(value) {
            return Err(DeckError::PathSecurityError(format!(
                "Potentially dangerous characters in path: {:?}",
                value
            )));
        }
    }
    Ok(())
}

/// Collapse `.` and `..` components without consulting the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `path` against `base_dir` and validate the result.
///
/// Relative paths are joined onto `base_dir` (or the working directory when no base is given).
/// The result must stay under `base_dir` unless `allow_traversal` is set, and may not be nested
/// deeper than `max_depth` directories below it (below the root for paths outside it).
pub fn resolve_safe_path(
    path: &str,
    base_dir: Option<&Path>,
    allow_traversal: bool,
    max_depth: Option<usize>,
) -> Result<PathBuf> {
    check_shell_injection(path)?;

    let base = match base_dir {
        Some(base) => base.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let base = normalize_path(&base);

    let candidate = Path::new(path);
    let resolved = if candidate.is_absolute() {
        normalize_path(candidate)
    } else {
        normalize_path(&base.join(candidate))
    };

    if base_dir.is_some() && !allow_traversal && !resolved.starts_with(&base) {
        return Err(DeckError::PathSecurityError(format!(
            "Path traversal detected: {} escapes {}",
            path,
            base.display()
        )));
    }

    if let Some(limit) = max_depth {
        // Paths outside the base are measured from the filesystem root instead.
        let measured = resolved.strip_prefix(&base).unwrap_or(&resolved);
        let depth = measured
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
            .saturating_sub(1);
        if depth > limit {
            return Err(DeckError::PathSecurityError(format!(
                "Path depth {} exceeds maximum of {}: {}",
                depth, limit, path
            )));
        }
    }

    Ok(resolved)
}

/// A safe filename is a single non-empty path segment with no shell metacharacters.
pub fn is_safe_filename(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if name.contains('/') || name.contains('\\') {
        return false;
    }
    check_shell_injection(name).is_ok()
}

/// Replace unsafe characters so `name` can be used as a single filename segment
pub fn sanitize_filename(name: &str, replacement: char) -> String {
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(name, replacement.to_string().as_str());

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == replacement && collapsed.ends_with(replacement) {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim_matches(|c: char| c == replacement || c.is_whitespace());
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Validate that a file exists
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DeckError::PathNotFoundError(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(DeckError::ValidationError(format!(
            "Path is not a file: {:?}",
            path
        )));
    }
    Ok(())
}

/// Ensure a file's parent directory exists, creating it if necessary
pub fn ensure_parent_directory_exists(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        } else if !parent.is_dir() {
            return Err(DeckError::ValidationError(format!(
                "Path exists but is not a directory: {:?}",
                parent
            )));
        }
    }
    Ok(())
}
