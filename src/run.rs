//! Run records: which step at a depth is in progress and which ones finished.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one step invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunId(u64);

impl RunId {
    pub(crate) fn next() -> Self {
        Self(NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Bookkeeping for one step invocation.
///
/// `running` is true from the moment the step starts until its own hooks,
/// body and call-site hooks are done. Records are kept after completion so
/// later siblings can report on them.
#[derive(Debug)]
pub struct RunRecord {
    id: RunId,
    description: String,
    running: AtomicBool,
}

impl RunRecord {
    pub(crate) fn start(description: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: RunId::next(),
            description: description.into(),
            running: AtomicBool::new(true),
        })
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    /// The step's message.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Append-only list of the records started at one context.
#[derive(Debug, Default)]
pub(crate) struct RunRegistry {
    records: Vec<Arc<RunRecord>>,
}

impl RunRegistry {
    pub(crate) fn last(&self) -> Option<&Arc<RunRecord>> {
        self.records.last()
    }

    pub(crate) fn push(&mut self, record: Arc<RunRecord>) {
        self.records.push(record);
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<RunRecord>> {
        self.records.clone()
    }

    pub(crate) fn running_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_running()).count()
    }
}
