use serde::Serialize;
use std::any::Any;
use thiserror::Error;

/// Boxed error returned by step bodies and hooks.
///
/// Any error type converts into it with `?`, including a child step's
/// [`TrackerError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The point in a step's lifecycle where a failure was caught.
///
/// Used in [`StepFailure`] to identify which part of the step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    /// A hook registered with `before_each` on the invoking context.
    BeforeEach,
    /// A call-site hook registered with `before` inside the step body.
    Before,
    /// The step body itself.
    Body,
    /// A call-site hook registered with `after` inside the step body.
    After,
    /// A hook registered with `after_each` on the invoking context.
    AfterEach,
}

impl std::fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePhase::BeforeEach => write!(f, "before_each"),
            FailurePhase::Before => write!(f, "before"),
            FailurePhase::Body => write!(f, "body"),
            FailurePhase::After => write!(f, "after"),
            FailurePhase::AfterEach => write!(f, "after_each"),
        }
    }
}

/// A hook or body failure caught by the engine.
///
/// Failures never interrupt the remaining hooks or the queue drain. They are
/// logged, collected into the step's report, and only surface as an error
/// when the tracker runs with [`FailurePolicy::Propagate`](crate::FailurePolicy::Propagate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    /// Where the failure happened.
    pub phase: FailurePhase,
    /// Rendered error text (or panic payload).
    pub message: String,
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.message)
    }
}

/// Errors surfaced by the tracker.
///
/// # Non-Exhaustive
///
/// This enum is marked `#[non_exhaustive]`; always include a wildcard arm
/// when matching on it.
///
/// ```
/// use devlog::TrackerError;
///
/// fn describe(error: &TrackerError) -> String {
///     match error {
///         TrackerError::StepFailed { message, failures } => {
///             format!("step {} failed {} time(s)", message, failures.len())
///         }
///         TrackerError::NoRuntime => "no tokio runtime".to_string(),
///         _ => error.to_string(),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TrackerError {
    /// The root context was built outside of a tokio runtime and no
    /// handle was supplied.
    #[error("No tokio runtime available to drive steps")]
    NoRuntime,

    /// A step body or hook failed and the tracker propagates failures.
    #[error("Step failed: {message}, {} failure(s), first: {}", .failures.len(), first_failure(.failures))]
    StepFailed {
        /// The message of the step that failed.
        message: String,
        /// Every failure caught while running the step.
        failures: Vec<StepFailure>,
    },

    /// The task driving the step went away before reporting back.
    #[error("Step abandoned before completion: {message}")]
    Abandoned {
        /// The message of the abandoned step.
        message: String,
    },

    /// The configured color range is empty.
    #[error("Invalid color range: min {min} is greater than max {max}")]
    InvalidColorRange {
        /// Lower bound.
        min: u8,
        /// Upper bound.
        max: u8,
    },
}

fn first_failure(failures: &[StepFailure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

/// Renders a caught panic payload as a failure message.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(Box::new("static")), "panicked: static");
        assert_eq!(
            panic_message(Box::new("owned".to_string())),
            "panicked: owned"
        );
        assert_eq!(panic_message(Box::new(42u8)), "panicked");
    }

    #[test]
    fn test_error_display() {
        let error = TrackerError::StepFailed {
            message: "load".to_string(),
            failures: vec![StepFailure {
                phase: FailurePhase::Body,
                message: "boom".to_string(),
            }],
        };
        assert_eq!(
            error.to_string(),
            "Step failed: load, 1 failure(s), first: body failed: boom"
        );

        let abandoned = TrackerError::Abandoned {
            message: "load".to_string(),
        };
        assert_eq!(
            abandoned.to_string(),
            "Step abandoned before completion: load"
        );
    }

    #[test]
    fn test_failure_phase_display() {
        assert_eq!(FailurePhase::BeforeEach.to_string(), "before_each");
        assert_eq!(FailurePhase::Before.to_string(), "before");
        assert_eq!(FailurePhase::Body.to_string(), "body");
        assert_eq!(FailurePhase::After.to_string(), "after");
        assert_eq!(FailurePhase::AfterEach.to_string(), "after_each");
    }
}
