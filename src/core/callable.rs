//! Callables and their arguments.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::AppResult;

/// Positional and keyword arguments for a callable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    keywords: Map<String, Value>,
}

impl Arguments {
    /// No arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments only.
    #[must_use]
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keywords: Map::new(),
        }
    }

    /// Append a positional argument.
    #[must_use]
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument, replacing any earlier value under the same name.
    #[must_use]
    pub fn with_keyword(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    /// Positional argument at `index`.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Keyword argument named `name`.
    #[must_use]
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    /// All positional arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.positional
    }

    /// All keyword arguments.
    #[must_use]
    pub const fn keywords(&self) -> &Map<String, Value> {
        &self.keywords
    }

    /// Number of positional arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// True when there are neither positional nor keyword arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }
}

/// A unit of work the bridge can schedule on the runtime.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use multitask_bridge::core::{AppResult, Arguments, Callable};
/// use serde_json::Value;
///
/// struct Sum;
///
/// #[async_trait]
/// impl Callable for Sum {
///     async fn call(&self, args: Arguments) -> AppResult<Value> {
///         let total: i64 = args.args().iter().filter_map(Value::as_i64).sum();
///         Ok(total.into())
///     }
/// }
/// ```
#[async_trait]
pub trait Callable: Send + Sync + 'static {
    /// Run the callable with `args`.
    async fn call(&self, args: Arguments) -> AppResult<Value>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Callable shared between the submitter and the runtime.
pub type SharedCallable = Arc<dyn Callable>;

/// Adapter turning a synchronous closure into a [`Callable`].
pub struct FnCallable<F> {
    name: String,
    f: F,
}

impl<F> fmt::Debug for FnCallable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallable").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Callable for FnCallable<F>
where
    F: Fn(Arguments) -> AppResult<Value> + Send + Sync + 'static,
{
    async fn call(&self, args: Arguments) -> AppResult<Value> {
        (self.f)(args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Adapter turning a closure that returns a future into a [`Callable`].
pub struct AsyncFnCallable<F, Fut> {
    name: String,
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> fmt::Debug for AsyncFnCallable<F, Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFnCallable").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Callable for AsyncFnCallable<F, Fut>
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Value>> + Send + 'static,
{
    async fn call(&self, args: Arguments) -> AppResult<Value> {
        (self.f)(args).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a synchronous closure.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> SharedCallable
where
    F: Fn(Arguments) -> AppResult<Value> + Send + Sync + 'static,
{
    Arc::new(FnCallable { name: name.into(), f })
}

/// Wrap an asynchronous closure.
pub fn from_async_fn<F, Fut>(name: impl Into<String>, f: F) -> SharedCallable
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Value>> + Send + 'static,
{
    Arc::new(AsyncFnCallable {
        name: name.into(),
        f,
        _fut: PhantomData,
    })
}
