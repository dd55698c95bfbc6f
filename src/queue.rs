//! Backlog of sibling steps waiting for the active one to finish.

use crate::error::TrackerError;
use crate::step::{Body, StepReport};
use std::collections::VecDeque;
use tokio::sync::oneshot;

pub(crate) type Completion = oneshot::Sender<Result<StepReport, TrackerError>>;

/// A step registered at a context.
///
/// The front entry is the active step; it stays in the queue until its whole
/// lifecycle is done.
pub(crate) struct PendingEntry {
    pub(crate) message: String,
    pub(crate) body: Option<Body>,
    pub(crate) completion: Option<Completion>,
}

impl PendingEntry {
    pub(crate) fn new(message: String, body: Body, completion: Completion) -> Self {
        Self {
            message,
            body: Some(body),
            completion: Some(completion),
        }
    }
}

/// FIFO of [`PendingEntry`]. Entries are never reordered or dropped, only
/// taken from the front.
#[derive(Default)]
pub(crate) struct PendingQueue {
    entries: VecDeque<PendingEntry>,
}

impl PendingQueue {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn push_back(&mut self, entry: PendingEntry) {
        self.entries.push_back(entry);
    }

    pub(crate) fn front_mut(&mut self) -> Option<&mut PendingEntry> {
        self.entries.front_mut()
    }

    pub(crate) fn pop_front(&mut self) -> Option<PendingEntry> {
        self.entries.pop_front()
    }

    pub(crate) fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }
}
