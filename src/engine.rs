//! The step engine: start or queue an invocation, run its lifecycle, drain
//! the siblings queued behind it.
//!
//! Each depth has at most one driver task at a time. The driver owns the
//! front of the depth's queue: it runs that step, pops it, and loops while
//! more siblings are waiting. An invocation that finds the queue empty
//! starts the step's bookkeeping on the spot and spawns the driver; one that
//! finds it busy only enqueues.

use crate::color::ColorPath;
use crate::context::{NestedContext, Scope, ScopeState};
use crate::error::{panic_message, FailurePhase, StepFailure};
use crate::hook::run_hooks;
use crate::queue::PendingEntry;
use crate::run::RunRecord;
use crate::step::{Body, Outcome, StepHandle, StepReport};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Bookkeeping of a step that has left the queued state.
pub(crate) struct Started {
    pub(crate) record: Arc<RunRecord>,
    pub(crate) colors: ColorPath,
    pub(crate) prefix: String,
    previous: Option<Arc<RunRecord>>,
}

impl Scope {
    /// Entry point behind every `step*` call.
    pub(crate) fn invoke(self: &Arc<Self>, message: String, body: Body) -> StepHandle {
        let (tx, rx) = oneshot::channel();

        if self.skip {
            let started = self.begin(&mut self.lock(), &message);
            self.report_misuse(&started, &message);
            self.shared.printer.skipped(&started.prefix, &message);
            started.record.finish();
            let report = StepReport {
                id: started.record.id(),
                message: message.clone(),
                outcome: Outcome::Skipped,
                failures: Vec::new(),
            };
            let _ = tx.send(Ok(report));
            return StepHandle::new(message, Some(started.record), rx);
        }

        let mut state = self.lock();
        if state.queue.is_empty() {
            let started = self.begin(&mut state, &message);
            let record = Arc::clone(&started.record);
            state
                .queue
                .push_back(PendingEntry::new(message.clone(), body, tx));
            self.idle.send_modify(|idle| *idle = false);
            drop(state);

            self.report_misuse(&started, &message);
            let driver = Arc::clone(self);
            drop(self.shared.runtime.spawn(driver.drain(started)));
            return StepHandle::new(message, Some(record), rx);
        }

        let overlapping = state.runs.last().filter(|r| r.is_running()).cloned();
        let prefix = self.shared.printer.prefix(&state.colors);
        state
            .queue
            .push_back(PendingEntry::new(message.clone(), body, tx));
        debug!(
            "Step '{}' queued at level {} behind {:?}",
            message,
            self.level,
            state.queue.messages()
        );
        drop(state);

        if let Some(previous) = overlapping {
            warn!(
                "Step '{}' invoked while '{}' is still running at level {}",
                message,
                previous.description(),
                self.level
            );
            self.shared
                .printer
                .overlap(&prefix, &message, previous.description());
        }
        StepHandle::new(message, None, rx)
    }

    /// Registers a starting step: run record, color, registry entry.
    fn begin(&self, state: &mut ScopeState, message: &str) -> Started {
        let record = RunRecord::start(message);
        let previous = state.runs.last().cloned();

        let code = self.shared.colors.pick(self.level);
        state.colors = state.colors.with_level(self.level, code);
        let prefix = self.shared.printer.prefix(&state.colors);

        debug!("Previous step: {:?}", previous.as_deref());
        debug!("Current step: {:?}", record);
        debug!("Parent step: {:?}", self.parent_run.as_deref());

        state.runs.push(Arc::clone(&record));
        if state.runs.running_count() > 1 {
            debug!(
                "{} steps marked running at level {}",
                state.runs.running_count(),
                self.level
            );
        }

        Started {
            record,
            colors: state.colors.clone(),
            prefix,
            previous,
        }
    }

    /// Prints the advisory warnings for a step that is starting.
    fn report_misuse(&self, started: &Started, message: &str) {
        let printer = &self.shared.printer;
        let previous = started.previous.as_deref();

        if let Some(parent) = self.parent_run.as_deref().filter(|p| !p.is_running()) {
            warn!(
                "Step '{}' started after its parent '{}' finished",
                message,
                parent.description()
            );
            printer.parent_finished(
                &started.prefix,
                message,
                parent.description(),
                previous.map(RunRecord::description),
            );
        }

        if let Some(previous) = previous.filter(|p| p.is_running()) {
            warn!(
                "Step '{}' started while '{}' is still running",
                message,
                previous.description()
            );
            printer.overlap(&started.prefix, message, previous.description());
        }
    }

    /// Runs the front of the queue until the queue is empty.
    async fn drain(self: Arc<Self>, first: Started) {
        let mut first = Some(first);
        loop {
            let (message, body, completion, started, fresh) = {
                let mut state = self.lock();
                let Some(entry) = state.queue.front_mut() else {
                    self.idle.send_modify(|idle| *idle = true);
                    return;
                };
                let message = entry.message.clone();
                let body = entry.body.take();
                let completion = entry.completion.take();
                match first.take() {
                    Some(started) => (message, body, completion, started, false),
                    None => {
                        let started = self.begin(&mut state, &message);
                        (message, body, completion, started, true)
                    }
                }
            };
            // Steps that waited in the queue report misuse when they start.
            if fresh {
                self.report_misuse(&started, &message);
            }
            debug!(
                "Running step '{}' at level {} ({} body)",
                message,
                self.level,
                match &body {
                    Some(b) if b.is_async() => "async",
                    Some(_) => "sync",
                    None => "no",
                }
            );

            let report = self.run_started(&message, body, &started).await;

            let more = {
                let mut state = self.lock();
                state.queue.pop_front();
                started.record.finish();
                let more = !state.queue.is_empty();
                if !more {
                    self.idle.send_modify(|idle| *idle = true);
                }
                more
            };
            if let Some(completion) = completion {
                let _ = completion.send(report.into_result(self.shared.config.failure_policy));
            }
            if !more {
                break;
            }
        }
    }

    /// Hooks and body of a step that has started.
    async fn run_started(
        &self,
        message: &str,
        body: Option<Body>,
        started: &Started,
    ) -> StepReport {
        let mut failures = Vec::new();
        let printer = &self.shared.printer;
        let own_info = self.info(message);

        let before_each = self.lock().hooks.before.clone();
        let runtime = &self.shared.runtime;
        run_hooks(
            runtime,
            before_each.iter(),
            &own_info,
            FailurePhase::BeforeEach,
            &mut failures,
        )
        .await;

        let child = Arc::new(self.child(
            message,
            started.colors.clone(),
            Arc::clone(&started.record),
        ));
        let child_info = child.info(message);
        printer.header(&started.prefix, message);

        match body {
            Some(Body::Async(f)) => {
                // The closure's synchronous prefix registers call-site hooks.
                let cx = NestedContext::from_scope(Arc::clone(&child));
                let future = catch_unwind(AssertUnwindSafe(move || f(cx)));
                let before = child.call_site().before.clone();
                run_hooks(runtime, before.iter(), &child_info, FailurePhase::Before, &mut failures).await;

                let outcome = match future {
                    Ok(future) => match self.shared.runtime.spawn(future).await {
                        Ok(result) => result.map_err(|e| e.to_string()),
                        Err(e) if e.is_panic() => Err(panic_message(e.into_panic())),
                        Err(e) => Err(e.to_string()),
                    },
                    Err(payload) => Err(panic_message(payload)),
                };
                self.record_body(started, message, outcome, &mut failures);
            }
            Some(Body::Sync(f)) => {
                let before = child.call_site().before.clone();
                run_hooks(runtime, before.iter(), &child_info, FailurePhase::Before, &mut failures).await;

                let cx = NestedContext::from_scope(Arc::clone(&child));
                let outcome = match catch_unwind(AssertUnwindSafe(move || f(cx))) {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(payload) => Err(panic_message(payload)),
                };
                self.record_body(started, message, outcome, &mut failures);

                let late = child.call_site().before.len() - before.len();
                if late > 0 {
                    warn!(
                        "{} call-site before hook(s) registered by synchronous step '{}' were not run",
                        late, message
                    );
                }
            }
            None => warn!("Step '{}' reached the engine without a body", message),
        }

        let after = child.call_site().after.clone();
        run_hooks(
            runtime,
            after.iter().rev(),
            &child_info,
            FailurePhase::After,
            &mut failures,
        )
        .await;

        let after_each = self.lock().hooks.after.clone();
        run_hooks(
            runtime,
            after_each.iter().rev(),
            &own_info,
            FailurePhase::AfterEach,
            &mut failures,
        )
        .await;

        StepReport {
            id: started.record.id(),
            message: message.to_string(),
            outcome: Outcome::Completed,
            failures,
        }
    }

    fn record_body(
        &self,
        started: &Started,
        message: &str,
        outcome: Result<(), String>,
        failures: &mut Vec<StepFailure>,
    ) {
        if let Err(e) = outcome {
            error!("Step '{}' body failed: {}", message, e);
            self.shared.printer.body_failed(&started.prefix, &e);
            failures.push(StepFailure {
                phase: FailurePhase::Body,
                message: e,
            });
        }
    }
}
