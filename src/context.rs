//! Contexts: one per nesting depth, exposing the step capability surface.
//!
//! [`RootContext`] is depth 0. Every step body receives a [`NestedContext`]
//! one level deeper, which additionally offers call-site hooks and its
//! description.

use crate::color::{ColorPath, ColorSource, RandomColors};
use crate::config::TrackerConfig;
use crate::diagnostic::{ConsoleSink, Printer, Sink};
use crate::error::TrackerError;
use crate::hook::{Hook, HookSet, StepInfo};
use crate::queue::PendingQueue;
use crate::run::{RunRecord, RunRegistry};
use crate::step::{Body, BodyResult, StepHandle};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

/// State shared by every context of one root tree.
pub(crate) struct Shared {
    pub(crate) config: TrackerConfig,
    pub(crate) printer: Printer,
    pub(crate) colors: Arc<dyn ColorSource>,
    pub(crate) runtime: Handle,
}

/// Mutable per-depth state, guarded by one lock so queue checks and run
/// registration happen atomically.
#[derive(Default)]
pub(crate) struct ScopeState {
    pub(crate) queue: PendingQueue,
    pub(crate) runs: RunRegistry,
    pub(crate) colors: ColorPath,
    pub(crate) hooks: HookSet,
}

/// One nesting depth.
pub(crate) struct Scope {
    pub(crate) level: usize,
    pub(crate) name: String,
    pub(crate) description_path: Arc<[String]>,
    pub(crate) skip: bool,
    pub(crate) parent_run: Option<Arc<RunRecord>>,
    /// Hooks the enclosing invocation runs around this depth's body.
    pub(crate) call_site: Arc<Mutex<HookSet>>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) state: Mutex<ScopeState>,
    pub(crate) idle: watch::Sender<bool>,
}

impl Scope {
    fn new(
        level: usize,
        name: String,
        description_path: Arc<[String]>,
        colors: ColorPath,
        skip: bool,
        parent_run: Option<Arc<RunRecord>>,
        shared: Arc<Shared>,
    ) -> Self {
        debug!(
            "Context created: name='{}' level={} colors={:?} skip={}",
            name,
            level,
            colors.codes(),
            skip
        );
        let (idle, _) = watch::channel(true);
        Self {
            level,
            name,
            description_path,
            skip,
            parent_run,
            call_site: Arc::new(Mutex::new(HookSet::default())),
            shared,
            state: Mutex::new(ScopeState {
                colors,
                ..ScopeState::default()
            }),
            idle,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn call_site(&self) -> MutexGuard<'_, HookSet> {
        self.call_site.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Context for the body of a step started here with `colors` in effect.
    pub(crate) fn child(&self, message: &str, colors: ColorPath, run: Arc<RunRecord>) -> Self {
        // The root step's message becomes the name, not a path segment.
        let (name, path) = if self.level == 0 {
            (message.to_string(), Vec::new())
        } else {
            let mut path = self.description_path.to_vec();
            path.push(message.to_string());
            (self.name.clone(), path)
        };
        Self::new(
            self.level + 1,
            name,
            path.into(),
            colors,
            false,
            Some(run),
            Arc::clone(&self.shared),
        )
    }

    /// Same depth, same lineage, always skipping, with its own queue and runs.
    fn skipping(&self) -> Self {
        let colors = self.lock().colors.clone();
        Self::new(
            self.level,
            self.name.clone(),
            Arc::clone(&self.description_path),
            colors,
            true,
            self.parent_run.clone(),
            Arc::clone(&self.shared),
        )
    }

    pub(crate) fn info(&self, message: &str) -> StepInfo {
        StepInfo {
            name: self.name.clone(),
            level: self.level,
            description_path: Arc::clone(&self.description_path),
            message: message.to_string(),
        }
    }

    async fn wait_idle(&self) {
        let mut rx = self.idle.subscribe();
        if rx.wait_for(|idle| *idle).await.is_err() {
            debug!("Idle channel closed at level {}", self.level);
        }
    }
}

/// Generates the capabilities both context kinds share.
macro_rules! common_capabilities {
    ($ty:ident) => {
        impl $ty {
            /// Runs an asynchronous step one level deeper.
            ///
            /// If a sibling is still active at this depth the step is queued
            /// and starts once everything before it has finished.
            pub fn step<F, Fut>(&self, message: impl Into<String>, body: F) -> StepHandle
            where
                F: FnOnce(NestedContext) -> Fut + Send + 'static,
                Fut: Future<Output = BodyResult> + Send + 'static,
            {
                self.scope.invoke(message.into(), Body::future(body))
            }

            /// Runs a synchronous step one level deeper.
            pub fn step_sync<F>(&self, message: impl Into<String>, body: F) -> StepHandle
            where
                F: FnOnce(NestedContext) -> BodyResult + Send + 'static,
            {
                self.scope.invoke(message.into(), Body::sync(body))
            }

            /// Runs a prepared [`Body`].
            pub fn step_with(&self, message: impl Into<String>, body: Body) -> StepHandle {
                self.scope.invoke(message.into(), body)
            }

            /// A context at the same depth on which every step is skipped.
            pub fn skip(&self) -> Self {
                Self {
                    scope: Arc::new(self.scope.skipping()),
                }
            }

            /// Message of the root step of this tree.
            pub fn name(&self) -> &str {
                &self.scope.name
            }

            pub fn level(&self) -> usize {
                self.scope.level
            }

            pub fn is_skipping(&self) -> bool {
                self.scope.skip
            }

            /// Registers a hook run before every step invoked on this context.
            pub fn before_each(&self, hook: Arc<dyn Hook>) {
                self.scope.lock().hooks.before.push(hook);
            }

            /// Registers a hook run after every step invoked on this context.
            ///
            /// After-hooks run in reverse registration order.
            pub fn after_each(&self, hook: Arc<dyn Hook>) {
                self.scope.lock().hooks.after.push(hook);
            }

            /// Every step started on this context, oldest first.
            pub fn runs(&self) -> Vec<Arc<RunRecord>> {
                self.scope.lock().runs.snapshot()
            }

            /// Number of steps registered here and not yet finished,
            /// the active one included.
            pub fn pending(&self) -> usize {
                self.scope.lock().queue.len()
            }

            /// Current color path of this depth.
            pub fn color_path(&self) -> ColorPath {
                self.scope.lock().colors.clone()
            }

            /// Resolves once no step is active or queued on this context.
            pub async fn idle(&self) {
                self.scope.wait_idle().await;
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("name", &self.scope.name)
                    .field("level", &self.scope.level)
                    .field("description_path", &self.scope.description_path)
                    .field("skip", &self.scope.skip)
                    .finish()
            }
        }
    };
}

/// Depth 0 of a step tree.
///
/// # Examples
///
/// ```
/// use devlog::RootContext;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), devlog::TrackerError> {
/// let root = RootContext::new()?;
/// let report = root
///     .step("load", |cx| async move {
///         cx.step("parse", |_| async { Ok(()) }).await?;
///         Ok(())
///     })
///     .await?;
/// assert!(report.is_clean());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RootContext {
    scope: Arc<Scope>,
}

common_capabilities!(RootContext);

impl RootContext {
    /// Root context with default configuration on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NoRuntime`] outside of a tokio runtime.
    pub fn new() -> Result<Self, TrackerError> {
        Self::builder().build()
    }

    pub fn with_config(config: TrackerConfig) -> Result<Self, TrackerError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> RootBuilder {
        RootBuilder::new()
    }
}

/// Context handed to a step body, one level below the invoking context.
#[derive(Clone)]
pub struct NestedContext {
    scope: Arc<Scope>,
}

common_capabilities!(NestedContext);

impl NestedContext {
    pub(crate) fn from_scope(scope: Arc<Scope>) -> Self {
        Self { scope }
    }

    /// Registers a hook the enclosing invocation runs right before this
    /// body. Register it before the body's first await.
    pub fn before(&self, hook: Arc<dyn Hook>) {
        self.scope.call_site().before.push(hook);
    }

    /// Registers a hook the enclosing invocation runs right after this body.
    ///
    /// These run in reverse registration order.
    pub fn after(&self, hook: Arc<dyn Hook>) {
        self.scope.call_site().after.push(hook);
    }

    /// Message of the step whose body this is, below the root step.
    ///
    /// `None` at level 1, where the step message is the [`name`](Self::name).
    pub fn description(&self) -> Option<&str> {
        self.scope.description_path.last().map(String::as_str)
    }

    /// Messages of every enclosing step below the root step, outermost first.
    pub fn description_path(&self) -> &[String] {
        &self.scope.description_path
    }
}

/// Builder for [`RootContext`].
#[derive(Default)]
pub struct RootBuilder {
    name: String,
    config: Option<TrackerConfig>,
    colors: Option<Arc<dyn ColorSource>>,
    sink: Option<Arc<dyn Sink>>,
    runtime: Option<Handle>,
}

impl RootBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name reported by the root context. Nested contexts take the root
    /// step's message instead.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the per-level color choice. Defaults to [`RandomColors`]
    /// over the configured range.
    pub fn colors(mut self, colors: Arc<dyn ColorSource>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Where console lines go. Defaults to stdout.
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Runtime that drives the steps. Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<RootContext, TrackerError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| TrackerError::NoRuntime)?,
        };
        let config = self.config.unwrap_or_default();
        let colors = self
            .colors
            .unwrap_or_else(|| Arc::new(RandomColors::new(config.color_range)));
        let sink = self.sink.unwrap_or_else(|| Arc::new(ConsoleSink));
        let printer = Printer::new(sink, config.color, config.glyph.clone());

        let shared = Arc::new(Shared {
            config,
            printer,
            colors,
            runtime,
        });
        let scope = Scope::new(
            0,
            self.name,
            Arc::from(Vec::<String>::new()),
            ColorPath::new(),
            false,
            None,
            shared,
        );
        Ok(RootContext {
            scope: Arc::new(scope),
        })
    }
}
