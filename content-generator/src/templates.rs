//! Boilerplate scaffolding for generated Python files.
//!
//! The renderers own the structure (shebang, future import, `main()` guard);
//! callers supply the semantic parts.

use crate::error::Result;
use minijinja::{AutoEscape, Environment, UndefinedBehavior, context};
use serde::{Deserialize, Serialize};

pub const LESSON_TEMPLATE: &str = r#"#!/usr/bin/env python
"""{{ module_docstring }}"""

from __future__ import annotations

{{ imports }}


{{ body }}


def main() -> None:
    """{{ main_docstring }}"""
    {{ main_body }}


if __name__ == "__main__":
    import doctest

    doctest.testmod()
    main()
"#;

pub const ASYNCIO_LESSON_TEMPLATE: &str = r#"#!/usr/bin/env python
"""{{ module_docstring }}"""

from __future__ import annotations

import asyncio
{{ imports }}


{{ body }}


async def main() -> None:
    """{{ main_docstring }}"""
    {{ main_body }}


if __name__ == "__main__":
    import doctest

    doctest.testmod()
    asyncio.run(main())
"#;

pub const APP_TEMPLATE: &str = r#""""{{ module_docstring }}"""

from __future__ import annotations

{{ imports }}


{{ body }}
"#;

pub const APP_TEST_TEMPLATE: &str = APP_TEMPLATE;

pub const DEFAULT_MAIN_DOCSTRING: &str = "Run lesson demonstrations.";
pub const DEFAULT_ASYNC_MAIN_DOCSTRING: &str = "Run async lesson demonstrations.";
pub const DEFAULT_MAIN_BODY: &str = "pass";

/// Parts of a lesson module. Unset `main_*` fields take the defaults of the
/// renderer they are passed to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonParts {
    pub module_docstring: String,
    pub imports: String,
    pub body: String,
    pub main_docstring: Option<String>,
    pub main_body: Option<String>,
}

impl LessonParts {
    pub fn new(module_docstring: impl Into<String>, body: impl Into<String>) -> Self {
        Self { module_docstring: module_docstring.into(), body: body.into(), ..Default::default() }
    }

    pub fn with_imports(mut self, imports: impl Into<String>) -> Self {
        self.imports = imports.into();
        self
    }

    pub fn with_main(mut self, docstring: impl Into<String>, body: impl Into<String>) -> Self {
        self.main_docstring = Some(docstring.into());
        self.main_body = Some(body.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppParts {
    pub module_docstring: String,
    pub imports: String,
    pub body: String,
}

impl AppParts {
    pub fn new(module_docstring: impl Into<String>, body: impl Into<String>) -> Self {
        Self { module_docstring: module_docstring.into(), body: body.into(), imports: String::new() }
    }

    pub fn with_imports(mut self, imports: impl Into<String>) -> Self {
        self.imports = imports.into();
        self
    }
}

pub fn render_lesson_template(parts: &LessonParts) -> Result<String> {
    render_lesson("lesson.py", LESSON_TEMPLATE, parts, DEFAULT_MAIN_DOCSTRING)
}

pub fn render_asyncio_lesson_template(parts: &LessonParts) -> Result<String> {
    render_lesson("asyncio_lesson.py", ASYNCIO_LESSON_TEMPLATE, parts, DEFAULT_ASYNC_MAIN_DOCSTRING)
}

pub fn render_app_template(parts: &AppParts) -> Result<String> {
    render_app("app.py", APP_TEMPLATE, parts)
}

pub fn render_app_test_template(parts: &AppParts) -> Result<String> {
    render_app("test_app.py", APP_TEST_TEMPLATE, parts)
}

fn render_lesson(
    name: &'static str,
    source: &'static str,
    parts: &LessonParts,
    default_docstring: &str,
) -> Result<String> {
    let env = environment();
    let template = env.template_from_named_str(name, source)?;
    Ok(template.render(context! {
        module_docstring => parts.module_docstring,
        imports => parts.imports,
        body => parts.body,
        main_docstring => parts.main_docstring.as_deref().unwrap_or(default_docstring),
        main_body => parts.main_body.as_deref().unwrap_or(DEFAULT_MAIN_BODY),
    })?)
}

fn render_app(name: &'static str, source: &'static str, parts: &AppParts) -> Result<String> {
    let env = environment();
    let template = env.template_from_named_str(name, source)?;
    Ok(template.render(context! {
        module_docstring => parts.module_docstring,
        imports => parts.imports,
        body => parts.body,
    })?)
}

/// Python source, so nothing is escaped and missing variables are errors.
fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env
}
