//! Registry of fixed and templated resources.
//!
//! Resolution order: an exact match against fixed URIs wins; otherwise
//! templates are tried in registration order and the first structural match
//! is invoked with the extracted placeholder values. Nothing is cached.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content::ResourceContent;
use crate::error::{ResourceError, ResourceResult};
use crate::template::{TemplateParams, UriTemplate, has_braces};

/// Resolver for a resource registered under one exact URI.
#[async_trait]
pub trait FixedResolver: Send + Sync {
    /// Produces the resource content.
    async fn read(&self) -> ResourceResult<ResourceContent>;
}

#[async_trait]
impl<F, Fut> FixedResolver for F
where
    F: Send + Sync + Fn() -> Fut,
    Fut: Future<Output = ResourceResult<ResourceContent>> + Send,
{
    async fn read(&self) -> ResourceResult<ResourceContent> {
        (self)().await
    }
}

/// Resolver for a resource registered under a URI pattern.
#[async_trait]
pub trait TemplateResolver: Send + Sync {
    /// Produces the resource content for the extracted placeholder values.
    async fn read(&self, params: TemplateParams) -> ResourceResult<ResourceContent>;
}

#[async_trait]
impl<F, Fut> TemplateResolver for F
where
    F: Send + Sync + Fn(TemplateParams) -> Fut,
    Fut: Future<Output = ResourceResult<ResourceContent>> + Send,
{
    async fn read(&self, params: TemplateParams) -> ResourceResult<ResourceContent> {
        (self)(params).await
    }
}

/// Display metadata attached to a registered resource or template.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
}

impl ResourceInfo {
    /// Creates metadata for the supplied URI or pattern.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the advertised MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Returns the URI or pattern.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the advertised MIME type.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}

struct FixedEntry {
    info: ResourceInfo,
    resolver: Arc<dyn FixedResolver>,
}

struct TemplateEntry {
    info: ResourceInfo,
    template: UriTemplate,
    resolver: Arc<dyn TemplateResolver>,
}

#[derive(Clone, Default)]
struct Entries {
    fixed: Vec<Arc<FixedEntry>>,
    templates: Vec<Arc<TemplateEntry>>,
}

impl Entries {
    fn contains(&self, uri: &str) -> bool {
        self.fixed.iter().any(|entry| entry.info.uri == uri)
            || self
                .templates
                .iter()
                .any(|entry| entry.template.as_str() == uri)
    }
}

/// Shared registry of fixed and templated resources.
#[derive(Default)]
pub struct ResourceRegistry {
    inner: RwLock<Entries>,
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("fixed", &self.list_fixed())
            .field("templates", &self.list_templates())
            .finish()
    }
}

impl ResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver under one exact URI.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPattern`] for an empty URI or one
    /// containing braces and [`ResourceError::DuplicateUri`] if the URI is
    /// already registered.
    pub fn register_fixed<R>(&self, uri: impl Into<String>, resolver: R) -> ResourceResult<()>
    where
        R: FixedResolver + 'static,
    {
        self.register_fixed_info(ResourceInfo::new(uri), resolver)
    }

    /// Registers a fixed resolver together with its display metadata.
    ///
    /// # Errors
    ///
    /// See [`ResourceRegistry::register_fixed`].
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_fixed_info<R>(&self, info: ResourceInfo, resolver: R) -> ResourceResult<()>
    where
        R: FixedResolver + 'static,
    {
        let uri = info.uri();
        if uri.trim().is_empty() {
            return Err(ResourceError::invalid_pattern(uri, "uri cannot be empty"));
        }
        if has_braces(uri) {
            return Err(ResourceError::invalid_pattern(
                uri,
                "fixed uri cannot contain braces; register it as a template",
            ));
        }

        let mut inner = self.inner.write().expect("resource registry poisoned");
        if inner.contains(uri) {
            return Err(ResourceError::DuplicateUri {
                uri: uri.to_owned(),
            });
        }

        debug!(uri, "registered fixed resource");
        inner.fixed.push(Arc::new(FixedEntry {
            info,
            resolver: Arc::new(resolver),
        }));
        Ok(())
    }

    /// Registers a resolver under a URI pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPattern`] if the pattern fails to parse
    /// and [`ResourceError::DuplicateUri`] if it is textually identical to an
    /// existing registration.
    pub fn register_template<R>(&self, pattern: &str, resolver: R) -> ResourceResult<()>
    where
        R: TemplateResolver + 'static,
    {
        self.register_template_info(ResourceInfo::new(pattern), resolver)
    }

    /// Registers a template resolver together with its display metadata.
    ///
    /// # Errors
    ///
    /// See [`ResourceRegistry::register_template`].
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_template_info<R>(&self, info: ResourceInfo, resolver: R) -> ResourceResult<()>
    where
        R: TemplateResolver + 'static,
    {
        let template = UriTemplate::parse(info.uri())?;

        let mut inner = self.inner.write().expect("resource registry poisoned");
        if inner.contains(template.as_str()) {
            return Err(ResourceError::DuplicateUri {
                uri: template.as_str().to_owned(),
            });
        }

        debug!(pattern = template.as_str(), "registered resource template");
        inner.templates.push(Arc::new(TemplateEntry {
            info,
            template,
            resolver: Arc::new(resolver),
        }));
        Ok(())
    }

    /// Fixed URIs in registration order.
    #[must_use]
    pub fn list_fixed(&self) -> Vec<String> {
        self.snapshot().list_fixed()
    }

    /// Template patterns in registration order.
    #[must_use]
    pub fn list_templates(&self) -> Vec<String> {
        self.snapshot().list_templates()
    }

    /// Metadata of fixed resources in registration order.
    #[must_use]
    pub fn describe_fixed(&self) -> Vec<ResourceInfo> {
        self.snapshot().describe_fixed()
    }

    /// Metadata of templates in registration order.
    #[must_use]
    pub fn describe_templates(&self) -> Vec<ResourceInfo> {
        self.snapshot().describe_templates()
    }

    /// Captures the current registrations. Later registrations do not affect
    /// the returned snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> ResourceSnapshot {
        let inner = self.inner.read().expect("resource registry poisoned");
        ResourceSnapshot {
            entries: Arc::new(inner.clone()),
        }
    }

    /// Resolves a concrete URI to content.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when nothing matches, or the
    /// resolver's own error.
    pub async fn resolve(&self, uri: &str) -> ResourceResult<ResourceContent> {
        self.snapshot().resolve(uri).await
    }
}

/// Immutable view over the registrations present when it was taken.
#[derive(Clone, Default)]
pub struct ResourceSnapshot {
    entries: Arc<Entries>,
}

impl fmt::Debug for ResourceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSnapshot")
            .field("fixed", &self.list_fixed())
            .field("templates", &self.list_templates())
            .finish()
    }
}

impl ResourceSnapshot {
    /// Fixed URIs in registration order.
    #[must_use]
    pub fn list_fixed(&self) -> Vec<String> {
        self.entries
            .fixed
            .iter()
            .map(|entry| entry.info.uri.clone())
            .collect()
    }

    /// Template patterns in registration order.
    #[must_use]
    pub fn list_templates(&self) -> Vec<String> {
        self.entries
            .templates
            .iter()
            .map(|entry| entry.template.as_str().to_owned())
            .collect()
    }

    /// Metadata of fixed resources in registration order.
    #[must_use]
    pub fn describe_fixed(&self) -> Vec<ResourceInfo> {
        self.entries
            .fixed
            .iter()
            .map(|entry| entry.info.clone())
            .collect()
    }

    /// Metadata of templates in registration order.
    #[must_use]
    pub fn describe_templates(&self) -> Vec<ResourceInfo> {
        self.entries
            .templates
            .iter()
            .map(|entry| entry.info.clone())
            .collect()
    }

    /// Returns the registered template whose pattern text equals `pattern`.
    #[must_use]
    pub fn template(&self, pattern: &str) -> Option<&UriTemplate> {
        self.entries
            .templates
            .iter()
            .map(|entry| &entry.template)
            .find(|template| template.as_str() == pattern)
    }

    /// Markdown listing of fixed URIs and template patterns, handed to the
    /// model as a system message in resource mode.
    #[must_use]
    pub fn catalog(&self) -> String {
        let mut doc = String::from("### Available resources\n");
        for uri in self.list_fixed() {
            doc.push_str("- ");
            doc.push_str(&uri);
            doc.push('\n');
        }
        doc.push_str("### Available templates\n");
        let templates = self.list_templates();
        let lines: Vec<String> = templates.iter().map(|t| format!("- {t}")).collect();
        doc.push_str(&lines.join("\n"));
        doc
    }

    /// Resolves a concrete URI to content.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] when nothing matches, or the
    /// resolver's own error.
    pub async fn resolve(&self, uri: &str) -> ResourceResult<ResourceContent> {
        if let Some(entry) = self.entries.fixed.iter().find(|entry| entry.info.uri == uri) {
            debug!(uri, "resolving fixed resource");
            return entry.resolver.read().await;
        }

        for entry in &self.entries.templates {
            if let Some(params) = entry.template.matches(uri) {
                debug!(
                    uri,
                    pattern = entry.template.as_str(),
                    "resolving templated resource"
                );
                return entry.resolver.read(params).await;
            }
        }

        debug!(uri, "resource not found");
        Err(ResourceError::NotFound {
            uri: uri.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::content::ContentKind;

    async fn greeting() -> ResourceResult<ResourceContent> {
        Ok(ResourceContent::text("Hello from a resource"))
    }

    async fn repo_info(params: TemplateParams) -> ResourceResult<ResourceContent> {
        let owner = params.require("owner")?;
        let repo = params.require("repo")?;
        Ok(ResourceContent::json(&json!({
            "owner": owner,
            "name": repo,
            "full_name": format!("{owner}/{repo}"),
            "stars": 120,
            "forks": 48,
        })))
    }

    fn registry() -> ResourceRegistry {
        let registry = ResourceRegistry::new();
        registry
            .register_fixed("resource://greeting", greeting)
            .unwrap();
        registry
            .register_template("repos://{owner}/{repo}/info", repo_info)
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn resolves_fixed_resource() {
        let content = registry().resolve("resource://greeting").await.unwrap();
        assert_eq!(content.kind(), ContentKind::Text);
        assert_eq!(content.as_text(), Some("Hello from a resource"));
    }

    #[tokio::test]
    async fn resolves_template_with_extracted_params() {
        let content = registry()
            .resolve("repos://openai/gpt-4/info")
            .await
            .unwrap();
        let value: Value = serde_json::from_str(content.as_text().unwrap()).unwrap();
        assert_eq!(value["full_name"], "openai/gpt-4");
        assert_eq!(value["stars"], 120);
        assert_eq!(value["forks"], 48);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let registry = registry();
        let first = registry.resolve("repos://a/b/info").await.unwrap();
        let second = registry.resolve("repos://a/b/info").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unmatched_uri_is_not_found() {
        let registry = registry();
        for uri in ["repos://openai/info", "resource://missing", "repos://{a}/b/info"] {
            let err = registry.resolve(uri).await.expect_err(uri);
            assert_eq!(err, ResourceError::NotFound { uri: uri.into() });
        }
    }

    #[tokio::test]
    async fn fixed_match_beats_template() {
        let registry = ResourceRegistry::new();
        registry
            .register_template("users://{id}", |params: TemplateParams| async move {
                let id = params.get("id").unwrap_or_default().to_owned();
                Ok(ResourceContent::text(format!("template {id}")))
            })
            .unwrap();
        registry
            .register_fixed("users://me", || async { Ok(ResourceContent::text("fixed")) })
            .unwrap();

        let content = registry.resolve("users://me").await.unwrap();
        assert_eq!(content.as_text(), Some("fixed"));
        let content = registry.resolve("users://42").await.unwrap();
        assert_eq!(content.as_text(), Some("template 42"));
    }

    #[tokio::test]
    async fn first_registered_template_wins() {
        let registry = ResourceRegistry::new();
        registry
            .register_template("docs://{section}/{page}", |_: TemplateParams| async {
                Ok(ResourceContent::text("first"))
            })
            .unwrap();
        registry
            .register_template("docs://{area}/{slug}", |_: TemplateParams| async {
                Ok(ResourceContent::text("second"))
            })
            .unwrap();

        let content = registry.resolve("docs://guide/intro").await.unwrap();
        assert_eq!(content.as_text(), Some("first"));
    }

    #[test]
    fn duplicate_registrations_fail() {
        let registry = registry();
        let err = registry
            .register_fixed("resource://greeting", greeting)
            .expect_err("duplicate fixed");
        assert!(matches!(err, ResourceError::DuplicateUri { .. }));

        let err = registry
            .register_template("repos://{owner}/{repo}/info", repo_info)
            .expect_err("duplicate template");
        assert!(matches!(err, ResourceError::DuplicateUri { .. }));
    }

    #[test]
    fn invalid_registrations_fail() {
        let registry = ResourceRegistry::new();
        let err = registry
            .register_fixed("repos://{owner}", greeting)
            .expect_err("braces in fixed uri");
        assert!(matches!(err, ResourceError::InvalidPattern { .. }));

        let err = registry
            .register_template("repos://{owner}/{owner}", repo_info)
            .expect_err("repeated placeholder");
        assert!(matches!(err, ResourceError::InvalidPattern { .. }));
        assert!(registry.list_templates().is_empty());
    }

    #[test]
    fn lists_in_registration_order() {
        let registry = registry();
        registry
            .register_fixed_info(
                ResourceInfo::new("data://config")
                    .with_name("config")
                    .with_mime_type("application/json"),
                || async { Ok(ResourceContent::json(&json!({"debug": true}))) },
            )
            .unwrap();

        assert_eq!(
            registry.list_fixed(),
            ["resource://greeting", "data://config"]
        );
        assert_eq!(registry.list_templates(), ["repos://{owner}/{repo}/info"]);
        assert_eq!(
            registry.describe_fixed()[1].mime_type(),
            Some("application/json")
        );
    }

    #[test]
    fn catalog_lists_both_sections() {
        let catalog = registry().snapshot().catalog();
        assert_eq!(
            catalog,
            "### Available resources\n- resource://greeting\n### Available templates\n- repos://{owner}/{repo}/info"
        );
    }

    #[tokio::test]
    async fn snapshot_ignores_later_registrations() {
        let registry = registry();
        let snapshot = registry.snapshot();
        registry
            .register_fixed("data://late", || async { Ok(ResourceContent::text("late")) })
            .unwrap();

        assert_eq!(snapshot.list_fixed(), ["resource://greeting"]);
        assert!(snapshot.resolve("data://late").await.is_err());
        assert!(registry.resolve("data://late").await.is_ok());
    }

    #[tokio::test]
    async fn resolver_errors_propagate() {
        let registry = ResourceRegistry::new();
        registry
            .register_fixed("data://broken", || async {
                Err(ResourceError::failed("backend offline"))
            })
            .unwrap();
        let err = registry.resolve("data://broken").await.expect_err("fails");
        assert_eq!(err, ResourceError::failed("backend offline"));
    }
}
