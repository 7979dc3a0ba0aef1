//! # tmns Recipe Inspection
//!
//! File: cli/src/core/recipe.rs
//!
//! ## Overview
//!
//! A recipe is the Conan build description of one repository (`conanfile.py`).
//! tmns never models the recipe as a full object; the executor only asks
//! capability questions through the [`Recipe`] trait, so the underlying format
//! can change without touching the executor.
//!
use crate::core::error::TmnsError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Recipe file names looked up in a repository checkout, in order.
pub const RECIPE_FILENAMES: [&str; 1] = ["conanfile.py"];

/// Capability queries the executor needs from a build recipe.
pub trait Recipe {
    /// Whether the recipe defines its own deployment procedure.
    fn has_deploy_method(&self) -> bool;

    /// Package name declared by the recipe, if it declares one.
    fn package_name(&self) -> Option<String>;

    /// Where the recipe was loaded from.
    fn path(&self) -> &Path;
}

/// A `conanfile.py` read from disk.
#[derive(Debug, Clone)]
pub struct ConanRecipe {
    path: PathBuf,
    text: String,
}

fn deploy_method_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // A `def deploy(` at any indentation, not commented out.
    PATTERN.get_or_init(|| Regex::new(r"(?m)^[ \t]*def[ \t]+deploy[ \t]*\(").expect("valid regex"))
}

fn package_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Class attribute `name = "..."`.
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]+name[ \t]*=[ \t]*["']([^"']+)["']"#).expect("valid regex")
    })
}

impl ConanRecipe {
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Reads the recipe from a repository checkout.
    ///
    /// Fails with `TmnsError::MissingRecipe` when the directory has no recipe.
    pub fn locate(repo_dir: &Path) -> Result<Self, TmnsError> {
        for name in RECIPE_FILENAMES {
            let candidate = repo_dir.join(name);
            if candidate.is_file() {
                debug!("Found recipe: {}", candidate.display());
                let text = fs::read_to_string(&candidate).map_err(|e| {
                    TmnsError::FileSystem(format!("Failed to read {}: {}", candidate.display(), e))
                })?;
                return Ok(Self::from_text(candidate, text));
            }
        }
        Err(TmnsError::MissingRecipe {
            path: repo_dir.join(RECIPE_FILENAMES[0]).display().to_string(),
        })
    }
}

impl Recipe for ConanRecipe {
    fn has_deploy_method(&self) -> bool {
        deploy_method_pattern().is_match(&self.text)
    }

    fn package_name(&self) -> Option<String> {
        package_name_pattern()
            .captures(&self.text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
