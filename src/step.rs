use crate::config::FailurePolicy;
use crate::context::NestedContext;
use crate::error::{BoxError, StepFailure, TrackerError};
use crate::run::{RunId, RunRecord};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tokio::sync::oneshot;

/// Result returned by step bodies.
pub type BodyResult = Result<(), BoxError>;

pub(crate) type BodyFuture = Pin<Box<dyn Future<Output = BodyResult> + Send + 'static>>;

/// A step body, either run to completion in one call or awaited.
///
/// For asynchronous bodies, the code in the closure before the returned
/// future runs synchronously and is where call-site hooks get registered:
///
/// ```no_run
/// # use devlog::{hook_fn, NestedContext, BodyResult};
/// # async fn demo(cx: NestedContext) {
/// cx.step("outer", |cx| {
///     cx.before(hook_fn(|_| Ok(())));
///     async move { Ok(()) }
/// });
/// # }
/// ```
pub enum Body {
    Sync(Box<dyn FnOnce(NestedContext) -> BodyResult + Send>),
    Async(Box<dyn FnOnce(NestedContext) -> BodyFuture + Send>),
}

impl Body {
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce(NestedContext) -> BodyResult + Send + 'static,
    {
        Body::Sync(Box::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce(NestedContext) -> Fut + Send + 'static,
        Fut: Future<Output = BodyResult> + Send + 'static,
    {
        Body::Async(Box::new(move |cx| Box::pin(f(cx)) as BodyFuture))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Body::Async(_))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Sync(_) => write!(f, "Body::Sync"),
            Body::Async(_) => write!(f, "Body::Async"),
        }
    }
}

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Hooks and body ran (possibly with failures).
    Completed,
    /// The context was in skip mode; nothing ran.
    Skipped,
}

/// Summary of one finished step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub id: RunId,
    pub message: String,
    pub outcome: Outcome,
    /// Hook and body failures caught while running the step.
    pub failures: Vec<StepFailure>,
}

impl StepReport {
    /// Returns `true` if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn into_result(self, policy: FailurePolicy) -> Result<StepReport, TrackerError> {
        match policy {
            FailurePolicy::Propagate if !self.failures.is_empty() => {
                Err(TrackerError::StepFailed {
                    message: self.message,
                    failures: self.failures,
                })
            }
            _ => Ok(self),
        }
    }
}

/// Completion handle of an invoked step.
///
/// The step runs whether or not the handle is awaited. Awaiting it resolves
/// once the step's own lifecycle (hooks, body, call-site hooks) is done;
/// siblings queued behind it are not waited for.
///
/// Dropping the handle without awaiting is the "missing await" pattern: the
/// step still runs in order, and the tracker reports the misuse on the console.
pub struct StepHandle {
    message: String,
    record: Option<Arc<RunRecord>>,
    rx: oneshot::Receiver<Result<StepReport, TrackerError>>,
}

impl StepHandle {
    pub(crate) fn new(
        message: String,
        record: Option<Arc<RunRecord>>,
        rx: oneshot::Receiver<Result<StepReport, TrackerError>>,
    ) -> Self {
        Self {
            message,
            record,
            rx,
        }
    }

    /// The run record, if the step started during the invocation.
    ///
    /// Steps queued behind a running sibling get their record only when they
    /// start, so this is `None` for them.
    pub fn record(&self) -> Option<&Arc<RunRecord>> {
        self.record.as_ref()
    }
}

impl fmt::Debug for StepHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepHandle")
            .field("message", &self.message)
            .field("record", &self.record.as_ref().map(|r| r.id()))
            .finish()
    }
}

impl Future for StepHandle {
    type Output = Result<StepReport, TrackerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TrackerError::Abandoned {
                message: self.message.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
