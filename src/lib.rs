//! # devlog
//!
//! A nested, sequential step tracker for development runs.
//!
//! Steps are named units of work, synchronous or asynchronous, that can
//! invoke further steps one level deeper. The tracker prints one colored
//! header per step, runs hooks around every body, and keeps siblings at the
//! same depth strictly sequential even when the caller forgets to await them.
//! Forgotten awaits are reported on the console instead of silently
//! interleaving.
//!
//! ## Features
//!
//! - **Sequential siblings**: steps invoked while a sibling is active are
//!   queued and run in invocation order
//! - **Hooks**: `before_each` / `after_each` per context, `before` / `after`
//!   per call site, after-hooks in reverse order
//! - **Fail-soft**: hook and body failures (errors and panics) are caught,
//!   logged and reported; a [`FailurePolicy`] decides whether handles surface them
//! - **Skip mode**: `skip()` gives a context on which steps are recorded
//!   but never run
//! - **Diagnostics**: overlap and missing-await warnings, colored per-level
//!   prefixes
//!
//! ## Quick Start
//!
//! ```rust
//! use devlog::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), TrackerError> {
//! let root = RootContext::new()?;
//!
//! root.before_each(hook_fn(|info| {
//!     println!("starting {}", info.message);
//!     Ok(())
//! }));
//!
//! root.step("build", |cx| async move {
//!     cx.step("compile", |_| async { Ok(()) }).await?;
//!     cx.step("link", |_| async { Ok(()) }).await?;
//!     Ok(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Forgotten awaits
//!
//! ```rust
//! use devlog::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), TrackerError> {
//! let root = RootContext::new()?;
//! root.step("suite", |cx| async move {
//!     // Neither handle is awaited: "second" still waits for "first",
//!     // and an overlap warning is printed.
//!     cx.step("first", |_| async { Ok(()) });
//!     cx.step("second", |_| async { Ok(()) });
//!     cx.idle().await;
//!     Ok(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use devlog::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), TrackerError> {
//! let config = TrackerConfig {
//!     failure_policy: FailurePolicy::Propagate,
//!     ..TrackerConfig::default()
//! };
//! let root = RootContext::with_config(config)?;
//!
//! match root.step("flaky", |_| async { Err("boom".into()) }).await {
//!     Err(TrackerError::StepFailed { message, failures }) => {
//!         eprintln!("{} failed: {:?}", message, failures);
//!     }
//!     other => eprintln!("unexpected: {:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

mod color;
mod config;
mod context;
mod diagnostic;
mod engine;
mod error;
mod hook;
mod queue;
mod run;
mod step;

pub mod logging;
pub mod prelude;

pub use color::{ColorPath, ColorSource, RandomColors};
pub use config::{ColorRange, FailurePolicy, TrackerConfig};
pub use context::{NestedContext, RootBuilder, RootContext};
pub use diagnostic::{ConsoleSink, MemorySink, Sink};
pub use error::{BoxError, FailurePhase, StepFailure, TrackerError};
pub use hook::{async_hook_fn, hook_fn, Hook, HookResult, StepInfo};
pub use run::{RunId, RunRecord};
pub use step::{Body, BodyResult, Outcome, StepHandle, StepReport};
