//! `{{variable}}` substitution templates usable as immediate prompt generators.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Generation, PromptArgs, PromptArgument, PromptDescriptor, PromptGenerator};
use crate::message::PromptOutput;

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template operations.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A required variable was not provided.
    #[error("missing required variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// A `{{` was never closed.
    #[error("unterminated placeholder starting at byte {offset}")]
    Unterminated {
        /// Byte offset of the opening braces.
        offset: usize,
    },
}

/// A text template with `{{variable}}` placeholders.
///
/// Variables can be required or carry a default. Rendering through a
/// [`crate::PromptEngine`] yields plain text, which consumers treat as a single
/// user message.
///
/// # Examples
///
/// ```
/// use capbridge_prompts::{PromptArgs, PromptTemplate};
///
/// let template = PromptTemplate::builder("Explain {{topic}} to {{audience}}.")
///     .with_variable("audience", "a beginner")
///     .with_required_variable("topic")
///     .build()
///     .unwrap();
///
/// let rendered = template
///     .render_with(&PromptArgs::new().with("topic", "ownership"))
///     .unwrap();
/// assert_eq!(rendered, "Explain ownership to a beginner.");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptTemplate {
    template: String,
    variables: HashMap<String, String>,
    required_variables: Vec<String>,
}

impl PromptTemplate {
    /// Creates a template with no defaults and no required variables.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unterminated`] if a placeholder is not closed.
    pub fn new(template: impl Into<String>) -> TemplateResult<Self> {
        TemplateBuilder::new(template).build()
    }

    /// Returns a builder for constructing templates.
    #[must_use]
    pub fn builder(template: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(template)
    }

    /// Renders with the defaults only.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] if a required variable is not set.
    pub fn render(&self) -> TemplateResult<String> {
        self.render_with(&PromptArgs::new())
    }

    /// Renders with runtime arguments, which override defaults. Optional
    /// variables without a value render as the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] if a required variable is not set.
    pub fn render_with(&self, args: &PromptArgs) -> TemplateResult<String> {
        let mut rendered = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        let mut consumed = 0;

        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or(TemplateError::Unterminated {
                offset: consumed + start,
            })?;

            let name = after[..end].trim();
            match args.get(name).or_else(|| self.variables.get(name).map(String::as_str)) {
                Some(value) => rendered.push_str(value),
                None if self.required_variables.iter().any(|req| req == name) => {
                    return Err(TemplateError::MissingVariable {
                        name: name.to_owned(),
                    });
                }
                None => {}
            }

            let advance = start + 2 + end + 2;
            consumed += advance;
            rest = &rest[advance..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }

    /// Describes the template as a prompt listing entry, one argument per
    /// placeholder in first-appearance order.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unterminated`] if a placeholder is not closed.
    pub fn descriptor(&self, name: impl Into<String>) -> TemplateResult<PromptDescriptor> {
        let descriptor = placeholders(&self.template)?.into_iter().fold(
            PromptDescriptor::new(name),
            |descriptor, var| {
                let argument = if self.required_variables.contains(&var) {
                    PromptArgument::required(var)
                } else {
                    PromptArgument::optional(var)
                };
                descriptor.with_argument(argument)
            },
        );
        Ok(descriptor)
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl PromptGenerator for PromptTemplate {
    fn generate(&self, args: PromptArgs) -> Generation {
        Generation::Ready(
            self.render_with(&args)
                .map(PromptOutput::from)
                .map_err(Into::into),
        )
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Builder for constructing prompt templates.
pub struct TemplateBuilder {
    template: String,
    variables: HashMap<String, String>,
    required_variables: Vec<String>,
}

impl TemplateBuilder {
    /// Creates a new builder with the supplied template text.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            variables: HashMap::new(),
            required_variables: Vec::new(),
        }
    }

    /// Sets a variable with a default value.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Declares a required variable (must be provided at render time).
    #[must_use]
    pub fn with_required_variable(mut self, name: impl Into<String>) -> Self {
        self.required_variables.push(name.into());
        self
    }

    /// Builds the template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unterminated`] if a placeholder is not closed.
    pub fn build(self) -> TemplateResult<PromptTemplate> {
        placeholders(&self.template)?;
        Ok(PromptTemplate {
            template: self.template,
            variables: self.variables,
            required_variables: self.required_variables,
        })
    }
}

/// Distinct placeholder names in first-appearance order.
fn placeholders(template: &str) -> TemplateResult<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = template;
    let mut consumed = 0;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(TemplateError::Unterminated {
            offset: consumed + start,
        })?;

        let name = after[..end].trim();
        if !name.is_empty() && !names.iter().any(|known| known == name) {
            names.push(name.to_owned());
        }

        let advance = start + 2 + end + 2;
        consumed += advance;
        rest = &rest[advance..];
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::PromptEngine;
    use crate::error::PromptError;

    #[test]
    fn renders_defaults_and_overrides() {
        let template = PromptTemplate::builder("{{greeting}} {{name}}!")
            .with_variable("greeting", "Hello")
            .with_variable("name", "World")
            .build()
            .unwrap();

        assert_eq!(template.render().unwrap(), "Hello World!");

        let args = PromptArgs::new().with("name", "Alice");
        assert_eq!(template.render_with(&args).unwrap(), "Hello Alice!");
    }

    #[test]
    fn optional_variables_render_empty() {
        let template = PromptTemplate::new("[{{maybe}}] [{{ spaced }}]").unwrap();
        let args = PromptArgs::new().with("spaced", "ok");
        assert_eq!(template.render_with(&args).unwrap(), "[] [ok]");
    }

    #[test]
    fn required_variables_error_when_missing() {
        let template = PromptTemplate::builder("Hello {{name}}!")
            .with_required_variable("name")
            .build()
            .unwrap();

        let err = template.render().expect_err("should error");
        assert!(matches!(err, TemplateError::MissingVariable { name } if name == "name"));
    }

    #[test]
    fn unterminated_placeholder_rejected() {
        let err = PromptTemplate::new("Hi {{name").expect_err("unterminated");
        assert!(matches!(err, TemplateError::Unterminated { offset: 3 }));
    }

    #[test]
    fn placeholders_are_distinct_and_ordered() {
        let names = placeholders("{{b}} {{ a }} {{b}}").unwrap();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn descriptor_marks_required_arguments() {
        let template = PromptTemplate::builder("{{topic}} for {{audience}}")
            .with_required_variable("topic")
            .build()
            .unwrap();
        let descriptor = template.descriptor("explain").unwrap();
        let args: Vec<_> = descriptor
            .arguments()
            .iter()
            .map(|arg| (arg.name(), arg.is_required()))
            .collect();
        assert_eq!(args, [("topic", true), ("audience", false)]);
    }

    #[tokio::test]
    async fn template_serves_as_generator() {
        let template = PromptTemplate::builder("Explain {{topic}}.")
            .with_required_variable("topic")
            .build()
            .unwrap();
        let engine = PromptEngine::new();
        engine
            .register(template.descriptor("explain").unwrap(), template)
            .unwrap();

        let output = engine
            .render("explain", PromptArgs::new().with("topic", "lifetimes"))
            .await
            .unwrap();
        assert_eq!(output, PromptOutput::from("Explain lifetimes."));

        let err = engine
            .render("explain", PromptArgs::new())
            .await
            .expect_err("missing topic");
        assert!(matches!(err, PromptError::TemplateExecution { .. }));
    }
}
