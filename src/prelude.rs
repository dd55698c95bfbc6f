//! Commonly used types and traits

pub use crate::config::{FailurePolicy, TrackerConfig};
pub use crate::context::{NestedContext, RootContext};
pub use crate::error::{BoxError, TrackerError};
pub use crate::hook::{async_hook_fn, hook_fn, Hook, HookResult, StepInfo};
pub use crate::step::{BodyResult, Outcome, StepHandle, StepReport};
