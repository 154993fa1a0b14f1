use crate::errors::{AppError, DeliveryError};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tera::Tera;

const BUILTIN: &[(&str, &str)] = &[(
    "forgot_password.html",
    include_str!("../templates/forgot_password.html"),
)];

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// HTML email templates, addressed by name without the `.html` suffix.
pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    /// Built-in templates, overridden by any `*.html` found below `dir`.
    pub fn new(dir: Option<&str>) -> Result<Self, AppError> {
        let builtin = Self::builtin()?;
        let Some(dir) = dir else {
            return Ok(builtin);
        };

        let mut tera = Tera::new(&format!("{dir}/**/*.html"))
            .map_err(|e| AppError::TemplateError(e.to_string()))?;
        // extend() keeps templates already present, so files on disk win
        tera.extend(&builtin.tera)
            .map_err(|e| AppError::TemplateError(e.to_string()))?;
        tracing::debug!(template_dir = %dir, "email templates loaded");
        Ok(Self { tera })
    }

    pub fn builtin() -> Result<Self, AppError> {
        let templates = BUILTIN
            .iter()
            .map(|(name, body)| (name.to_string(), body.to_string()))
            .collect();
        Self::from_strings(templates)
    }

    pub fn from_strings(templates: HashMap<String, String>) -> Result<Self, AppError> {
        let mut tera = Tera::default();
        for (name, body) in templates {
            tera.add_raw_template(&name, &body)
                .map_err(|e| AppError::TemplateError(format!("{name}: {e}")))?;
        }
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, DeliveryError> {
        let context = tera::Context::from_serialize(context)?;
        Ok(self.tera.render(&format!("{name}.html"), &context)?)
    }
}

/// Removes markup from `html`, leaving text and entities untouched.
///
/// A `<` with no closing `>` after it is kept as text.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}
