//! Named generation domains (`dsa`, `asyncio`, ...) and their settings.

use crate::error::{GeneratorError, Result};
use crate::models::{PedagogyStyle, TargetProject, TemplateCategory};
use crate::project_registry::ProjectRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How generated doctests should handle nondeterministic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoctestStrategy {
    Deterministic,
    /// Use `# doctest: +ELLIPSIS` for timing or ordering dependent output.
    Ellipsis,
    Skip,
}

impl DoctestStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoctestStrategy::Deterministic => "deterministic",
            DoctestStrategy::Ellipsis => "ellipsis",
            DoctestStrategy::Skip => "skip",
        }
    }
}

impl std::fmt::Display for DoctestStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub name: String,
    pub project: TargetProject,
    pub pedagogy: PedagogyStyle,
    pub lesson_dir: String,
    pub template_path: Option<String>,
    /// Reference name to a path with source material, e.g. `cpython`.
    pub source_refs: BTreeMap<String, String>,
    pub strict_mypy: bool,
    pub doctest_strategy: DoctestStrategy,
}

impl DomainConfig {
    pub fn new(name: impl Into<String>, project: TargetProject, pedagogy: PedagogyStyle) -> Self {
        Self {
            name: name.into(),
            project,
            pedagogy,
            lesson_dir: "src".to_string(),
            template_path: None,
            source_refs: BTreeMap::new(),
            strict_mypy: true,
            doctest_strategy: DoctestStrategy::Deterministic,
        }
    }

    pub fn with_lesson_dir(mut self, dir: impl Into<String>) -> Self {
        self.lesson_dir = dir.into();
        self
    }

    pub fn with_template_path(mut self, path: impl Into<String>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    pub fn with_source_ref(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.source_refs.insert(name.into(), path.into());
        self
    }

    pub fn with_doctest_strategy(mut self, strategy: DoctestStrategy) -> Self {
        self.doctest_strategy = strategy;
        self
    }

    pub fn project_path(&self, registry: &ProjectRegistry) -> PathBuf {
        registry.project_path(self.project)
    }

    pub fn project_type(&self) -> TemplateCategory {
        self.project.category()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    domains: BTreeMap<String, DomainConfig>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four shipped domains; `home` locates the CPython checkout used as
    /// reference material.
    pub fn builtin(home: &Path) -> Self {
        let cpython = home.join("study").join("c").join("cpython").display().to_string();
        let mut registry = Self::new();

        registry.register(
            DomainConfig::new("dsa", TargetProject::Dsa, PedagogyStyle::ConceptFirst)
                .with_lesson_dir("src/algorithms")
                .with_template_path("notes/lesson_template.py")
                .with_source_ref("cpython", cpython.clone()),
        );
        registry.register(
            DomainConfig::new("asyncio", TargetProject::Asyncio, PedagogyStyle::ConceptFirst)
                .with_template_path("notes/lesson_template.py")
                .with_source_ref("cpython", cpython)
                .with_doctest_strategy(DoctestStrategy::Ellipsis),
        );
        registry.register(
            DomainConfig::new("litestar", TargetProject::Litestar, PedagogyStyle::IntegrationFirst)
                .with_doctest_strategy(DoctestStrategy::Skip),
        );
        registry.register(
            DomainConfig::new("fastapi", TargetProject::Fastapi, PedagogyStyle::ApplicationFirst)
                .with_doctest_strategy(DoctestStrategy::Skip),
        );

        registry
    }

    /// Adds or replaces a domain.
    pub fn register(&mut self, config: DomainConfig) {
        self.domains.insert(config.name.clone(), config);
    }

    pub fn get(&self, name: &str) -> Result<&DomainConfig> {
        self.domains.get(name).ok_or_else(|| GeneratorError::UnknownDomain {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }

    /// Sorted domain names.
    pub fn names(&self) -> Vec<&str> {
        self.domains.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_domains() {
        let registry = DomainRegistry::builtin(Path::new("/home/ada"));
        assert_eq!(registry.names(), vec!["asyncio", "dsa", "fastapi", "litestar"]);

        let dsa = registry.get("dsa").unwrap();
        assert_eq!(dsa.project, TargetProject::Dsa);
        assert_eq!(dsa.lesson_dir, "src/algorithms");
        assert_eq!(dsa.source_refs["cpython"], "/home/ada/study/c/cpython");
        assert_eq!(dsa.project_type(), TemplateCategory::LessonBased);

        let asyncio = registry.get("asyncio").unwrap();
        assert_eq!(asyncio.lesson_dir, "src");
        assert_eq!(asyncio.doctest_strategy, DoctestStrategy::Ellipsis);

        let fastapi = registry.get("fastapi").unwrap();
        assert_eq!(fastapi.pedagogy, PedagogyStyle::ApplicationFirst);
        assert!(fastapi.template_path.is_none());
        assert!(fastapi.strict_mypy);
        assert_eq!(fastapi.project_type(), TemplateCategory::AppBased);
    }

    #[test]
    fn test_unknown_domain() {
        let registry = DomainRegistry::builtin(Path::new("/home/ada"));
        let err = registry.get("rust").unwrap_err();
        assert_eq!(err.to_string(), "Unknown domain 'rust'. Available: asyncio, dsa, fastapi, litestar");
    }

    #[test]
    fn test_project_path() {
        let registry = DomainRegistry::builtin(Path::new("/home/ada"));
        let projects = ProjectRegistry::new("/study");
        let path = registry.get("litestar").unwrap().project_path(&projects);
        assert_eq!(path, PathBuf::from("/study/learning-litestar"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = DomainRegistry::new();
        registry.register(DomainConfig::new("dsa", TargetProject::Dsa, PedagogyStyle::ConceptFirst));
        registry.register(
            DomainConfig::new("dsa", TargetProject::Dsa, PedagogyStyle::ConceptFirst).with_lesson_dir("lessons"),
        );
        assert_eq!(registry.names().len(), 1);
        assert_eq!(registry.get("dsa").unwrap().lesson_dir, "lessons");
    }
}
