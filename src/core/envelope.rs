//! Task envelope handed to the dispatch loop.

use std::fmt;

use super::callable::{Arguments, SharedCallable};
use super::wake::WakePtr;

/// Immutable bundle of a callable, its arguments and the optional wake pointer.
///
/// Built by the submitter, consumed exactly once by the dispatch worker.
pub struct TaskEnvelope {
    callable: SharedCallable,
    arguments: Arguments,
    wake: Option<WakePtr>,
}

impl TaskEnvelope {
    /// Bundle a submission.
    #[must_use]
    pub fn new(callable: SharedCallable, arguments: Arguments, wake: Option<WakePtr>) -> Self {
        Self {
            callable,
            arguments,
            wake,
        }
    }

    /// The callable to run.
    #[must_use]
    pub fn callable(&self) -> &SharedCallable {
        &self.callable
    }

    /// Arguments the callable will receive.
    #[must_use]
    pub const fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Wake pointer to notify on completion, if any.
    #[must_use]
    pub const fn wake(&self) -> Option<WakePtr> {
        self.wake
    }

    /// Take the envelope apart for execution.
    #[must_use]
    pub fn into_parts(self) -> (SharedCallable, Arguments, Option<WakePtr>) {
        (self.callable, self.arguments, self.wake)
    }
}

impl fmt::Debug for TaskEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEnvelope")
            .field("callable", &self.callable.name())
            .field("arguments", &self.arguments)
            .field("wake", &self.wake)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::callable::from_fn;
    use serde_json::{json, Value};

    #[test]
    fn test_envelope_into_parts() {
        let callable = from_fn("noop", |_| Ok(Value::Null));
        let args = Arguments::positional([json!(1)]).with_keyword("k", "v");
        let wake = WakePtr::from_addr(0x40);

        let envelope = TaskEnvelope::new(callable, args.clone(), wake);
        assert_eq!(envelope.wake(), wake);
        assert_eq!(envelope.arguments(), &args);

        let (callable, arguments, wake_out) = envelope.into_parts();
        assert_eq!(callable.name(), "noop");
        assert_eq!(arguments, args);
        assert_eq!(wake_out, wake);
    }

    #[test]
    fn test_envelope_debug_names_callable() {
        let envelope = TaskEnvelope::new(from_fn("named", |_| Ok(Value::Null)), Arguments::new(), None);
        let rendered = format!("{envelope:?}");
        assert!(rendered.contains("\"named\""));
        assert!(rendered.contains("wake: None"));
    }
}
