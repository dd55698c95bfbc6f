//! Hooks run around step bodies and the registries that hold them.

use crate::error::{panic_message, BoxError, FailurePhase, StepFailure};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Result returned by hooks.
pub type HookResult = Result<(), BoxError>;

/// Read-only view of the step a hook runs around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
    /// Root step message shared by the whole tree.
    pub name: String,
    /// Depth of the context the hook belongs to.
    pub level: usize,
    /// Ancestor step messages of that context.
    pub description_path: Arc<[String]>,
    /// Message of the step being run.
    pub message: String,
}

/// A callable run before or after a step body.
///
/// Hooks registered with `before_each` / `after_each` run around every step
/// of their context. Hooks registered with `before` / `after` inside a body
/// run around that one body.
///
/// # Examples
///
/// ```
/// use devlog::{Hook, HookResult, StepInfo};
/// use async_trait::async_trait;
///
/// struct Announce;
///
/// #[async_trait]
/// impl Hook for Announce {
///     async fn call(&self, info: &StepInfo) -> HookResult {
///         println!("about to run {}", info.message);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, info: &StepInfo) -> HookResult;
}

struct FnHook<F>(F);

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&StepInfo) -> HookResult + Send + Sync + 'static,
{
    async fn call(&self, info: &StepInfo) -> HookResult {
        (self.0)(info)
    }
}

struct AsyncFnHook<F>(F);

#[async_trait]
impl<F, Fut> Hook for AsyncFnHook<F>
where
    F: Fn(StepInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    async fn call(&self, info: &StepInfo) -> HookResult {
        (self.0)(info.clone()).await
    }
}

/// Wraps a synchronous closure as a hook.
pub fn hook_fn<F>(f: F) -> Arc<dyn Hook>
where
    F: Fn(&StepInfo) -> HookResult + Send + Sync + 'static,
{
    Arc::new(FnHook(f))
}

/// Wraps an asynchronous closure as a hook.
///
/// The closure receives an owned [`StepInfo`] so the returned future can
/// outlive the borrow.
pub fn async_hook_fn<F, Fut>(f: F) -> Arc<dyn Hook>
where
    F: Fn(StepInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    Arc::new(AsyncFnHook(f))
}

/// Ordered `before` / `after` lists.
#[derive(Default, Clone)]
pub(crate) struct HookSet {
    pub(crate) before: Vec<Arc<dyn Hook>>,
    pub(crate) after: Vec<Arc<dyn Hook>>,
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

/// Runs `hooks` in order, catching every failure.
///
/// Each hook runs as its own task on `runtime` so a panic stays inside it.
/// A failing or panicking hook is logged and recorded; the remaining hooks
/// still run.
pub(crate) async fn run_hooks<'a, I>(
    runtime: &Handle,
    hooks: I,
    info: &StepInfo,
    phase: FailurePhase,
    failures: &mut Vec<StepFailure>,
) where
    I: IntoIterator<Item = &'a Arc<dyn Hook>>,
{
    for hook in hooks {
        let hook = Arc::clone(hook);
        let owned = info.clone();
        let outcome = match runtime.spawn(async move { hook.call(&owned).await }).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) if e.is_panic() => Err(panic_message(e.into_panic())),
            Err(e) => Err(e.to_string()),
        };
        if let Err(message) = outcome {
            tracing::error!(
                "Hook '{}' failed in step '{}': {}",
                phase,
                info.message,
                message
            );
            failures.push(StepFailure { phase, message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn info(message: &str) -> StepInfo {
        StepInfo {
            name: "root".to_string(),
            level: 1,
            description_path: Arc::from(vec!["root".to_string()]),
            message: message.to_string(),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Arc<dyn Hook> {
        let log = Arc::clone(log);
        hook_fn(move |info| {
            log.lock().unwrap().push(format!("{}:{}", tag, info.message));
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_hooks_run_in_given_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = vec![recorder(&log, "one"), recorder(&log, "two")];
        let mut failures = Vec::new();
        let runtime = Handle::current();

        run_hooks(&runtime, hooks.iter(), &info("s"), FailurePhase::BeforeEach, &mut failures).await;
        run_hooks(&runtime, hooks.iter().rev(), &info("s"), FailurePhase::AfterEach, &mut failures).await;

        assert!(failures.is_empty());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["one:s", "two:s", "two:s", "one:s"]
        );
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = vec![
            hook_fn(|_| Err("broken".into())),
            recorder(&log, "after-broken"),
        ];
        let mut failures = Vec::new();
        let runtime = Handle::current();

        run_hooks(&runtime, hooks.iter(), &info("s"), FailurePhase::Before, &mut failures).await;

        assert_eq!(*log.lock().unwrap(), vec!["after-broken:s"]);
        assert_eq!(
            failures,
            vec![StepFailure {
                phase: FailurePhase::Before,
                message: "broken".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_async_hook() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hook = {
            let log = Arc::clone(&log);
            async_hook_fn(move |info| {
                let log = Arc::clone(&log);
                async move {
                    tokio::task::yield_now().await;
                    log.lock().unwrap().push(info.message);
                    Ok(())
                }
            })
        };
        let mut failures = Vec::new();
        let runtime = Handle::current();

        run_hooks(&runtime, [&hook], &info("async"), FailurePhase::After, &mut failures).await;

        assert_eq!(*log.lock().unwrap(), vec!["async"]);
    }

    #[tokio::test]
    async fn test_panicking_hook_is_recorded_and_the_rest_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = vec![
            hook_fn(|info| panic!("hook blew up on {}", info.message)),
            recorder(&log, "survivor"),
        ];
        let mut failures = Vec::new();
        let runtime = Handle::current();

        run_hooks(&runtime, hooks.iter(), &info("s"), FailurePhase::BeforeEach, &mut failures).await;

        assert_eq!(*log.lock().unwrap(), vec!["survivor:s"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].phase, FailurePhase::BeforeEach);
        assert_eq!(failures[0].message, "panicked: hook blew up on s");
    }
}
