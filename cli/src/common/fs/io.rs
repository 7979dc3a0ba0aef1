//! # tmns Filesystem I/O Operations
//!
//! File: cli/src/common/fs/io.rs
//!
//! ## Overview
//!
//! Small wrappers around `std::fs` with consistent error context:
//!
//! - **`ensure_dir_exists`**: `mkdir -p`, failing if the path is a file.
//! - **`write_string_to_file`**: writes a file, creating its parent directory first.
//!   Used by `tmns config init`.
//! - **`remove_dir_if_exists`**: deletes a build root for a clean build.
//! - **`same_location`** / **`contains_location`**: compare paths after resolving
//!   `.`/`..` and symlinks, used by the clean-safety checks.
//!
use crate::core::error::{Result, TmnsError};
use anyhow::Context;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Ensures that a directory exists at the specified path, creating parents as needed.
///
/// # Errors
///
/// Returns an `Err` if the path exists but is not a directory, or if creation fails.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!(TmnsError::FileSystem(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    } else {
        debug!("Directory already exists: {:?}", path);
    }
    Ok(())
}

/// Writes string content to a file, overwriting it, after ensuring its parent exists.
pub fn write_string_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write to file {:?}", path))?;
    info!("Wrote content to file: {:?}", path);
    Ok(())
}

/// Recursively deletes `path` if it exists. Returns whether anything was removed.
pub fn remove_dir_if_exists(path: &Path) -> std::result::Result<bool, TmnsError> {
    if !path.exists() {
        debug!("Nothing to remove at {:?}", path);
        return Ok(false);
    }
    if !path.is_dir() {
        return Err(TmnsError::FileSystem(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    }
    fs::remove_dir_all(path)
        .map_err(|e| TmnsError::FileSystem(format!("Failed to remove {:?}: {}", path, e)))?;
    info!("Removed directory: {:?}", path);
    Ok(true)
}

/// Canonical form of `path`: symlinks resolved when it exists, otherwise
/// `.`/`..` folded lexically.
pub fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether two paths name the same location.
pub fn same_location(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

/// Whether `inner` is `outer` itself or lies somewhere below it.
pub fn contains_location(outer: &Path, inner: &Path) -> bool {
    normalize(inner).starts_with(normalize(outer))
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir_exists_creates_new() -> Result<()> {
        let base_dir = tempdir()?;
        let new_dir = base_dir.path().join("new/subdir");
        assert!(!new_dir.exists());
        ensure_dir_exists(&new_dir)?;
        assert!(new_dir.is_dir());
        Ok(())
    }

    #[test]
    fn test_ensure_dir_exists_path_is_file() -> Result<()> {
        let base_dir = tempdir()?;
        let file_path = base_dir.path().join("a_file.txt");
        fs::write(&file_path, "hello")?;
        let result = ensure_dir_exists(&file_path);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Path exists but is not a directory"));
        Ok(())
    }

    #[test]
    fn test_write_string_creates_parent() -> Result<()> {
        let base_dir = tempdir()?;
        let file_path = base_dir.path().join("tmns/config.toml");
        write_string_to_file(&file_path, "build_type = \"Release\"\n")?;
        assert_eq!(fs::read_to_string(&file_path)?, "build_type = \"Release\"\n");
        Ok(())
    }

    #[test]
    fn test_remove_dir_if_exists() -> Result<()> {
        let base_dir = tempdir()?;
        let build = base_dir.path().join("build");
        fs::create_dir_all(build.join("CMakeFiles"))?;
        fs::write(build.join("CMakeCache.txt"), "")?;
        assert!(remove_dir_if_exists(&build)?);
        assert!(!build.exists());
        assert!(!remove_dir_if_exists(&build)?);
        Ok(())
    }

    #[test]
    fn test_same_location_resolves_dots() -> Result<()> {
        let base_dir = tempdir()?;
        let repo = base_dir.path().join("repo");
        fs::create_dir(&repo)?;
        assert!(same_location(&repo.join("."), &repo));
        assert!(!same_location(&repo.join("build"), &repo));
        // Lexical fallback for paths that do not exist.
        assert!(same_location(Path::new("/nope/a/../b"), Path::new("/nope/b")));
        Ok(())
    }

    #[test]
    fn test_contains_location() -> Result<()> {
        let base_dir = tempdir()?;
        let home = base_dir.path().join("home");
        fs::create_dir(&home)?;
        assert!(contains_location(base_dir.path(), &home));
        assert!(contains_location(&home, &home.join(".")));
        assert!(contains_location(Path::new("/"), &home));
        assert!(!contains_location(&home.join("build"), &home));
        // Component-wise, not a string prefix.
        assert!(!contains_location(Path::new("/nope/ho"), Path::new("/nope/home")));
        Ok(())
    }
}
