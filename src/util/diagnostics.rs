//! Rendering of values and failures for cross-boundary error reporting.
//!
//! Also provides two callable wrappers: [`traced`] re-raises a failure bundled with the
//! captured call stack, and [`logged`] prints the failure and re-raises it unchanged.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use owo_colors::OwoColorize;
use serde_json::Value;
use tracing::error;

use crate::core::{AppResult, Arguments, Callable, SharedCallable};

/// Longest value preview, in chars, before truncation.
pub const MAX_PREVIEW_CHARS: usize = 256;

/// Render a value as a compact, deterministic preview.
#[must_use]
pub fn render_value(value: &Value) -> String {
    let full = value.to_string();
    if full.chars().count() <= MAX_PREVIEW_CHARS {
        return full;
    }
    let mut preview: String = full.chars().take(MAX_PREVIEW_CHARS).collect();
    preview.push('…');
    preview
}

/// Render a failure and its cause chain.
///
/// The colored and plain forms differ only in ANSI sequences around the labels.
#[must_use]
pub fn render_error(err: &anyhow::Error, colored: bool) -> String {
    let mut out = format!("{} {err}", label("error:", colored, Label::Error));
    for cause in err.chain().skip(1) {
        out.push('\n');
        out.push_str(&format!("{} {cause}", label("caused by:", colored, Label::Cause)));
    }
    out
}

/// Like [`render_error`], followed by the captured stack trace when one is available.
#[must_use]
pub fn render_error_with_trace(err: &anyhow::Error, colored: bool) -> String {
    let mut out = render_error(err, colored);
    let trace = err
        .downcast_ref::<TracedFailure>()
        .map_or_else(|| err.backtrace(), TracedFailure::trace);
    if trace.status() == BacktraceStatus::Captured {
        out.push('\n');
        out.push_str(&label("stacktrace:", colored, Label::Cause));
        out.push('\n');
        out.push_str(&trace.to_string());
    }
    out
}

#[derive(Clone, Copy)]
enum Label {
    Error,
    Cause,
}

fn label(text: &str, colored: bool, kind: Label) -> String {
    if !colored {
        return text.to_string();
    }
    match kind {
        Label::Error => text.red().bold().to_string(),
        Label::Cause => text.yellow().to_string(),
    }
}

/// A failure bundled with the call stack captured where it surfaced.
pub struct TracedFailure {
    original: anyhow::Error,
    trace: Backtrace,
}

impl TracedFailure {
    /// Bundle `original` with a freshly captured trace.
    #[must_use]
    pub fn capture(original: anyhow::Error) -> Self {
        Self {
            original,
            trace: Backtrace::force_capture(),
        }
    }

    /// The failure as raised by the callable.
    #[must_use]
    pub const fn original(&self) -> &anyhow::Error {
        &self.original
    }

    /// The captured call stack.
    #[must_use]
    pub const fn trace(&self) -> &Backtrace {
        &self.trace
    }

    /// Split back into the failure and its trace.
    #[must_use]
    pub fn into_parts(self) -> (anyhow::Error, Backtrace) {
        (self.original, self.trace)
    }
}

impl fmt::Debug for TracedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedFailure")
            .field("original", &self.original)
            .field("trace", &self.trace.status())
            .finish()
    }
}

impl fmt::Display for TracedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl std::error::Error for TracedFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.original.source()
    }
}

struct Traced(SharedCallable);

#[async_trait]
impl Callable for Traced {
    async fn call(&self, args: Arguments) -> AppResult<Value> {
        self.0
            .call(args)
            .await
            .map_err(|err| anyhow::Error::new(TracedFailure::capture(err)))
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

struct Logged(SharedCallable);

#[async_trait]
impl Callable for Logged {
    async fn call(&self, args: Arguments) -> AppResult<Value> {
        let outcome = self.0.call(args).await;
        if let Err(err) = &outcome {
            error!(
                callable = self.0.name(),
                "{}",
                render_error_with_trace(err, false)
            );
        }
        outcome
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

/// Wrap `callable` so failures are re-raised as [`TracedFailure`].
#[must_use]
pub fn traced(callable: SharedCallable) -> SharedCallable {
    Arc::new(Traced(callable))
}

/// Wrap `callable` so failures are logged with their trace and re-raised unchanged.
#[must_use]
pub fn logged(callable: SharedCallable) -> SharedCallable {
    Arc::new(Logged(callable))
}
