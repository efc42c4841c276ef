//! Reference lesson files used when a project ships no template of its own.
//!
//! These are shown to the model as examples; they are not rendered.

use crate::models::PedagogyStyle;

const CONCEPT_LESSON: &str = include_str!("concept_lesson.py.tmpl");
const INTEGRATION_LESSON: &str = include_str!("integration_lesson.py.tmpl");
const APP_SCAFFOLD: &str = include_str!("app_scaffold.py.tmpl");

pub fn builtin_template(style: PedagogyStyle) -> &'static str {
    match style {
        PedagogyStyle::ConceptFirst => CONCEPT_LESSON,
        PedagogyStyle::IntegrationFirst => INTEGRATION_LESSON,
        PedagogyStyle::ApplicationFirst => APP_SCAFFOLD,
    }
}
