//! Subcommands that call the content tools directly, without a model.

use crate::cli::TemplateKind;
use anyhow::Result;
use content_generator::templates::{
    render_app_template, render_app_test_template, render_asyncio_lesson_template,
    render_lesson_template,
};
use content_generator::{AppParts, AttemptHistory, ContentTools, LessonParts};

pub fn domains(tools: &ContentTools) -> String {
    tools.list_available_domains()
}

pub fn domain(tools: &ContentTools, name: &str) -> Result<String> {
    Ok(tools.get_domain_config(name)?)
}

pub fn analyze(tools: &ContentTools, project: &str) -> Result<String> {
    Ok(tools.analyze_target_project(project)?)
}

pub fn next_lesson(tools: &ContentTools, project: &str) -> Result<String> {
    Ok(tools.get_next_lesson_number(project)?)
}

/// Returns the report and whether every check passed.
pub async fn validate(tools: &ContentTools, project: &str, relative_path: &str) -> Result<(String, bool)> {
    let mut history = AttemptHistory::new(tools.config().max_repair_cycles);
    let report = tools.validate_generated_content(project, relative_path, &mut history).await?;
    let passed = history.latest().is_some_and(|attempt| attempt.passed);
    Ok((report, passed))
}

pub fn render(kind: TemplateKind, docstring: &str, imports: &str, body: &str) -> Result<String> {
    let rendered = match kind {
        TemplateKind::Lesson => {
            render_lesson_template(&LessonParts::new(docstring, body).with_imports(imports))?
        }
        TemplateKind::Asyncio => {
            render_asyncio_lesson_template(&LessonParts::new(docstring, body).with_imports(imports))?
        }
        TemplateKind::App => render_app_template(&AppParts::new(docstring, body).with_imports(imports))?,
        TemplateKind::AppTest => {
            render_app_test_template(&AppParts::new(docstring, body).with_imports(imports))?
        }
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_generator::GeneratorConfig;
    use tempfile::TempDir;

    fn tools(dir: &TempDir) -> ContentTools {
        ContentTools::new(GeneratorConfig::default().with_study_base(dir.path()))
    }

    #[test]
    fn test_next_lesson_in_empty_project() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("learning-dsa/src/algorithms")).unwrap();
        std::fs::write(dir.path().join("learning-dsa/src/algorithms/04_queues.py"), "").unwrap();

        assert_eq!(next_lesson(&tools(&dir), "learning-dsa").unwrap(), "Next lesson number: 5");
    }

    #[test]
    fn test_unknown_project_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = analyze(&tools(&dir), "learning-go").unwrap_err();
        assert!(err.to_string().starts_with("Unknown project 'learning-go'"));
    }

    #[test]
    fn test_domains() {
        let dir = TempDir::new().unwrap();
        assert!(domains(&tools(&dir)).starts_with("Available domains: "));
        assert!(domain(&tools(&dir), "asyncio").unwrap().contains("Project: learning-asyncio"));
    }

    #[test]
    fn test_render_lesson() {
        let out = render(TemplateKind::Lesson, "Lesson 2: Queues.", "import doctest", "x = 1").unwrap();
        assert!(out.contains("\"\"\"Lesson 2: Queues.\"\"\""));
        assert!(out.contains("import doctest"));
        assert!(out.contains("x = 1"));
    }

    #[test]
    fn test_render_app() {
        let out = render(TemplateKind::App, "Todo API.", "", "app = object()").unwrap();
        assert!(out.contains("Todo API."));
        assert!(out.contains("app = object()"));
    }
}
