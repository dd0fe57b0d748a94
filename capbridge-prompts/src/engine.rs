//! Registry of named prompt generators.
//!
//! A generator either completes immediately ([`Generation::Ready`]) or hands
//! back a future ([`Generation::Pending`]); [`PromptEngine::render`] awaits
//! the latter, so callers never observe the difference.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::{GeneratorError, GeneratorResult, PromptError, PromptResult};
use crate::message::PromptOutput;

/// Named arguments passed to a prompt generator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptArgs(BTreeMap<String, String>);

impl PromptArgs {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument, returning the updated set.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns the value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns the value of `name` or a [`MissingArgument`] error suitable for
    /// propagating out of a generator with `?`.
    ///
    /// # Errors
    ///
    /// Fails when the argument was not supplied.
    pub fn require(&self, name: &str) -> Result<&str, MissingArgument> {
        self.get(name).ok_or_else(|| MissingArgument {
            name: name.to_owned(),
        })
    }

    /// Iterates arguments in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PromptArgs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A required prompt argument was not supplied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing prompt argument `{name}`")]
pub struct MissingArgument {
    /// Name of the missing argument.
    pub name: String,
}

/// Result of starting a generator: either already complete or still running.
pub enum Generation {
    /// The generator completed synchronously.
    Ready(GeneratorResult<PromptOutput>),
    /// The generator suspended; the future yields its result.
    Pending(BoxFuture<'static, GeneratorResult<PromptOutput>>),
}

impl Generation {
    /// Whether the generator suspended.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Drives the generation to completion.
    ///
    /// # Errors
    ///
    /// Returns the generator's own error.
    pub async fn resolve(self) -> GeneratorResult<PromptOutput> {
        match self {
            Self::Ready(result) => result,
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Produces prompt output from named arguments.
pub trait PromptGenerator: Send + Sync {
    /// Starts generation.
    fn generate(&self, args: PromptArgs) -> Generation;
}

struct FnGenerator<F, O> {
    func: F,
    _output: PhantomData<fn() -> O>,
}

impl<F, O> PromptGenerator for FnGenerator<F, O>
where
    F: Fn(PromptArgs) -> GeneratorResult<O> + Send + Sync,
    O: Into<PromptOutput>,
{
    fn generate(&self, args: PromptArgs) -> Generation {
        Generation::Ready((self.func)(args).map(Into::into))
    }
}

struct AsyncFnGenerator<F, O> {
    func: F,
    _output: PhantomData<fn() -> O>,
}

impl<F, Fut, O> PromptGenerator for AsyncFnGenerator<F, O>
where
    F: Fn(PromptArgs) -> Fut + Send + Sync,
    Fut: Future<Output = GeneratorResult<O>> + Send + 'static,
    O: Into<PromptOutput> + 'static,
{
    fn generate(&self, args: PromptArgs) -> Generation {
        let future = (self.func)(args);
        Generation::Pending(Box::pin(async move { future.await.map(Into::into) }))
    }
}

/// One declared argument of a prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    required: bool,
}

impl PromptArgument {
    /// Declares an argument that must be supplied.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: true,
        }
    }

    /// Declares an argument that may be omitted.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Argument name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the argument must be supplied.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }
}

/// Listing entry for a registered prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    arguments: Vec<PromptArgument>,
}

impl PromptDescriptor {
    /// Creates a descriptor with no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares an argument.
    #[must_use]
    pub fn with_argument(mut self, argument: PromptArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Prompt name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prompt description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared arguments in declaration order.
    #[must_use]
    pub fn arguments(&self) -> &[PromptArgument] {
        &self.arguments
    }
}

impl From<&str> for PromptDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PromptDescriptor {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

struct PromptEntry {
    descriptor: PromptDescriptor,
    generator: Arc<dyn PromptGenerator>,
}

/// Registry of named prompt generators.
#[derive(Default)]
pub struct PromptEngine {
    inner: RwLock<Vec<Arc<PromptEntry>>>,
}

impl fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self
            .list()
            .into_iter()
            .map(|descriptor| descriptor.name)
            .collect();
        f.debug_struct("PromptEngine")
            .field("registered", &names)
            .finish()
    }
}

impl PromptEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a generator.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::EmptyName`] for a blank name and
    /// [`PromptError::DuplicatePrompt`] if the name is taken.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register<G>(&self, descriptor: impl Into<PromptDescriptor>, generator: G) -> PromptResult<()>
    where
        G: PromptGenerator + 'static,
    {
        let descriptor = descriptor.into();
        if descriptor.name.trim().is_empty() {
            return Err(PromptError::EmptyName);
        }

        let mut inner = self.inner.write().expect("prompt registry poisoned");
        if inner.iter().any(|entry| entry.descriptor.name == descriptor.name) {
            return Err(PromptError::DuplicatePrompt {
                name: descriptor.name,
            });
        }

        debug!(prompt = %descriptor.name, "registered prompt");
        inner.push(Arc::new(PromptEntry {
            descriptor,
            generator: Arc::new(generator),
        }));
        Ok(())
    }

    /// Registers a function that completes immediately.
    ///
    /// # Errors
    ///
    /// See [`PromptEngine::register`].
    pub fn register_fn<F, O>(&self, descriptor: impl Into<PromptDescriptor>, func: F) -> PromptResult<()>
    where
        F: Fn(PromptArgs) -> GeneratorResult<O> + Send + Sync + 'static,
        O: Into<PromptOutput> + 'static,
    {
        self.register(
            descriptor,
            FnGenerator {
                func,
                _output: PhantomData,
            },
        )
    }

    /// Registers a function whose result is produced by a future.
    ///
    /// # Errors
    ///
    /// See [`PromptEngine::register`].
    pub fn register_async<F, Fut, O>(
        &self,
        descriptor: impl Into<PromptDescriptor>,
        func: F,
    ) -> PromptResult<()>
    where
        F: Fn(PromptArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GeneratorResult<O>> + Send + 'static,
        O: Into<PromptOutput> + 'static,
    {
        self.register(
            descriptor,
            AsyncFnGenerator {
                func,
                _output: PhantomData,
            },
        )
    }

    /// Descriptors of every registered prompt in registration order.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn list(&self) -> Vec<PromptDescriptor> {
        let inner = self.inner.read().expect("prompt registry poisoned");
        inner.iter().map(|entry| entry.descriptor.clone()).collect()
    }

    /// Renders the named prompt.
    ///
    /// Arguments declared as required are checked before the generator runs.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::TemplateNotFound`] for an unknown name and
    /// [`PromptError::TemplateExecution`] wrapping the generator's error
    /// (including a [`MissingArgument`]).
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub async fn render(&self, name: &str, args: PromptArgs) -> PromptResult<PromptOutput> {
        let entry = {
            let inner = self.inner.read().expect("prompt registry poisoned");
            inner
                .iter()
                .find(|entry| entry.descriptor.name == name)
                .cloned()
                .ok_or_else(|| PromptError::TemplateNotFound {
                    name: name.to_owned(),
                })?
        };

        let execution = |source: GeneratorError| PromptError::TemplateExecution {
            name: name.to_owned(),
            source,
        };

        if let Some(missing) = entry
            .descriptor
            .arguments
            .iter()
            .find(|arg| arg.required && args.get(&arg.name).is_none())
        {
            let source: GeneratorError = Box::new(MissingArgument {
                name: missing.name.clone(),
            });
            return Err(execution(source));
        }

        let generation = entry.generator.generate(args);
        debug!(prompt = name, pending = generation.is_pending(), "rendering prompt");
        generation.resolve().await.map_err(execution)
    }
}
