//! Filesystem locations of the learning projects and the path guard that
//! keeps every read and write inside them.

use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use crate::models::TargetProject;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRegistry {
    study_base: PathBuf,
}

impl ProjectRegistry {
    pub fn new(study_base: impl Into<PathBuf>) -> Self {
        Self { study_base: study_base.into() }
    }

    /// Registry rooted at `CONTENT_GENERATOR_STUDY_BASE`, or `~/study/python`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os(crate::config::STUDY_BASE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| GeneratorConfig::default().study_base),
        )
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.study_base.clone())
    }

    pub fn study_base(&self) -> &Path {
        &self.study_base
    }

    pub fn project_path(&self, project: TargetProject) -> PathBuf {
        self.study_base.join(project.as_str())
    }

    pub fn allowed_roots(&self) -> Vec<PathBuf> {
        TargetProject::ALL.iter().map(|p| self.project_path(*p)).collect()
    }

    /// Resolves `path` and checks that it lies inside one of the project roots.
    pub fn validate_path(&self, path: &Path) -> Result<PathBuf> {
        let resolved = resolve(path)?;
        for root in self.allowed_roots() {
            if resolved.starts_with(resolve(&root)?) {
                return Ok(resolved);
            }
        }
        tracing::warn!(path = %resolved.display(), "rejected path outside project roots");
        Err(GeneratorError::PathOutsideRoots(resolved))
    }

    /// Joins `relative` onto the project root and validates the result.
    pub fn resolve_in_project(&self, project: TargetProject, relative: &str) -> Result<PathBuf> {
        self.validate_path(&self.project_path(project).join(relative))
    }
}

/// Makes `path` absolute, folds `.` and `..` lexically, then follows symlinks
/// for the longest prefix that exists on disk.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute =
        if path.is_absolute() { path.to_path_buf() } else { std::env::current_dir()?.join(path) };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        if existing.exists() {
            let mut resolved = existing.canonicalize()?;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(normalized),
        }
    }
}
