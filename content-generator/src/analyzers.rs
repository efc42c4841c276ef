//! Reads configuration, lessons, templates and progression notes from a
//! target learning project.

use crate::builtin_templates::builtin_template;
use crate::error::{GeneratorError, Result};
use crate::models::{ExistingLesson, LessonTemplate, PedagogyStyle, ProjectConfig, TargetProject};
use crate::project_registry::ProjectRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every directory that may hold project sources, in scan order.
const ALL_SOURCE_DIRS: [&str; 2] = ["app", "src"];

const EXAMPLE_LESSON_LIMIT: usize = 3;

/// Parses `pyproject.toml` at the project root.
pub fn analyze_project_config(registry: &ProjectRegistry, project: TargetProject) -> Result<ProjectConfig> {
    let project_path = registry.project_path(project);
    let pyproject_path = project_path.join("pyproject.toml");

    if !pyproject_path.exists() {
        return Err(GeneratorError::FileNotFound(format!(
            "pyproject.toml not found at {}",
            pyproject_path.display()
        )));
    }

    let text = fs::read_to_string(&pyproject_path)?;
    let data: toml::Table = toml::from_str(&text)
        .map_err(|source| GeneratorError::Toml { path: pyproject_path.clone(), source })?;

    let project_section = table(&data, "project");
    let tool_section = table(&data, "tool");

    // [tool.pytest.ini_options] wins over bare [tool.pytest]
    let pytest_section = tool_section.and_then(|t| table(t, "pytest")).map(|pytest| {
        table(pytest, "ini_options").unwrap_or(pytest)
    });
    let mypy_section = tool_section.and_then(|t| table(t, "mypy"));
    let ruff_section = tool_section.and_then(|t| table(t, "ruff"));

    let addopts: Vec<String> = match pytest_section.and_then(|p| p.get("addopts")) {
        Some(toml::Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
        Some(toml::Value::Array(items)) => {
            items.iter().filter_map(toml::Value::as_str).map(str::to_string).collect()
        }
        _ => Vec::new(),
    };
    let has_doctest_modules = addopts.iter().any(|opt| opt.contains("--doctest-modules"));

    let source_dirs = ALL_SOURCE_DIRS
        .iter()
        .filter(|dir| project_path.join(dir).is_dir())
        .map(|dir| dir.to_string())
        .collect();

    let config = ProjectConfig {
        name: string_or(project_section, "name", project.as_str()),
        python_version: string_or(project_section, "requires-python", ">=3.10"),
        has_doctest_modules,
        mypy_strict: mypy_section
            .and_then(|m| m.get("strict"))
            .and_then(toml::Value::as_bool)
            .unwrap_or(false),
        ruff_target_version: string_or(ruff_section, "target-version", "py310"),
        source_dirs,
    };

    debug!(project = %project, name = %config.name, "analyzed project config");
    Ok(config)
}

/// Lists `.py` files under the project's source directories, sorted per
/// directory and skipping dunder files such as `__init__.py`.
pub fn analyze_existing_lessons(
    registry: &ProjectRegistry,
    project: TargetProject,
) -> Result<Vec<ExistingLesson>> {
    let project_path = registry.project_path(project);
    let mut lessons = Vec::new();

    for src_dir in project.category().source_dirs() {
        let source_path = project_path.join(src_dir);
        if !source_path.is_dir() {
            continue;
        }
        for file in python_files(&source_path)? {
            if is_dunder(&file) {
                continue;
            }
            lessons.push(ExistingLesson {
                name: file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
                path: relative_display(&file, &project_path),
            });
        }
    }

    Ok(lessons)
}

/// Collects the project's lesson template, `AGENTS.md` conventions and a
/// few example lesson paths.
pub fn extract_template_patterns(registry: &ProjectRegistry, project: TargetProject) -> Result<LessonTemplate> {
    let project_path = registry.project_path(project);
    let mut template = LessonTemplate::new(project);

    let template_path = project_path.join("notes").join("lesson_template.py");
    if template_path.exists() {
        template.template_content = fs::read_to_string(&template_path)?;
    }

    let agents_path = project_path.join("AGENTS.md");
    if agents_path.exists() {
        template.conventions = fs::read_to_string(&agents_path)?;
    }

    for src_dir in project.category().source_dirs() {
        let source_path = project_path.join(src_dir);
        if !source_path.is_dir() {
            continue;
        }
        // dunder files still take one of the example slots
        for file in python_files(&source_path)?.into_iter().take(EXAMPLE_LESSON_LIMIT) {
            if !is_dunder(&file) {
                template.example_lessons.push(relative_display(&file, &project_path));
            }
        }
    }

    Ok(template)
}

/// Concatenates `notes/progression*.md` then `notes/progression*.txt`.
pub fn read_progression(registry: &ProjectRegistry, project: TargetProject) -> Result<String> {
    let notes_path = registry.project_path(project).join("notes");
    if !notes_path.is_dir() {
        return Ok(String::new());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(&notes_path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut parts = Vec::new();
    for extension in ["md", "txt"] {
        for path in &entries {
            let is_progression = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with("progression"))
                .unwrap_or(false);
            if is_progression && path.extension().is_some_and(|e| e == extension) {
                parts.push(fs::read_to_string(path)?);
            }
        }
    }

    Ok(parts.join("\n\n"))
}

/// One past the largest numeric filename prefix among existing lessons.
pub fn next_lesson_number(registry: &ProjectRegistry, project: TargetProject) -> Result<u64> {
    let mut max: Option<(u64, String)> = None;
    for lesson in analyze_existing_lessons(registry, project)? {
        if let Some(n) = leading_number(&lesson.name)? {
            if max.as_ref().is_none_or(|(m, _)| n > *m) {
                max = Some((n, lesson.name));
            }
        }
    }
    match max {
        None => Ok(1),
        Some((n, name)) => n.checked_add(1).ok_or(GeneratorError::LessonNumberOverflow(name)),
    }
}

pub fn read_template_with_fallback(
    registry: &ProjectRegistry,
    project: TargetProject,
    pedagogy: PedagogyStyle,
) -> Result<String> {
    let template = extract_template_patterns(registry, project)?;
    if !template.template_content.is_empty() {
        return Ok(template.template_content);
    }
    Ok(builtin_template(pedagogy).to_string())
}

pub fn read_source_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(GeneratorError::FileNotFound(format!("File not found: {}", path.display())));
    }
    Ok(fs::read_to_string(path)?)
}

fn table<'a>(parent: &'a toml::Table, key: &str) -> Option<&'a toml::Table> {
    parent.get(key).and_then(toml::Value::as_table)
}

fn string_or(section: Option<&toml::Table>, key: &str, fallback: &str) -> String {
    section
        .and_then(|s| s.get(key))
        .and_then(toml::Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

fn python_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == "py") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_dunder(path: &Path) -> bool {
    path.file_name().map(|n| n.to_string_lossy().starts_with("__")).unwrap_or(false)
}

fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn leading_number(name: &str) -> Result<Option<u64>> {
    let digits: String = name.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Ok(None);
    }
    digits
        .parse()
        .map(Some)
        .map_err(|_| GeneratorError::LessonNumberOverflow(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("07_heaps").unwrap(), Some(7));
        assert_eq!(leading_number("120_tries").unwrap(), Some(120));
        assert_eq!(leading_number("4294967296_big").unwrap(), Some(4_294_967_296));
        assert_eq!(leading_number("heaps").unwrap(), None);
        assert_eq!(leading_number("").unwrap(), None);
        assert!(matches!(
            leading_number("99999999999999999999_huge"),
            Err(GeneratorError::LessonNumberOverflow(_))
        ));
    }

    #[test]
    fn test_is_dunder() {
        assert!(is_dunder(Path::new("src/__init__.py")));
        assert!(is_dunder(Path::new("__main__.py")));
        assert!(!is_dunder(Path::new("src/_private.py")));
    }
}
