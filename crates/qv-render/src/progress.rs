//! Progress of a batch of loads

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Notify;

use qv_core::{Signal, SubscriptionId};

use crate::RenderOutcome;

/// Progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// `completed` of `steps` loads are done
    Advanced { completed: usize, steps: usize },
    /// Every load of the batch is done
    Finished,
}

/// Counts finished loads of a batch, e.g. the cells of a matrix
#[derive(Debug, Default)]
pub struct LoadProgress {
    /// Identifies the current batch; loads of older batches no longer count
    batch: AtomicU64,
    steps: AtomicUsize,
    completed: AtomicUsize,
    events: Signal<ProgressEvent>,
    finished: Notify,
}

impl LoadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new batch of `steps` loads and return its id
    pub fn set_steps(&self, steps: usize) -> u64 {
        let batch = self.batch.fetch_add(1, Ordering::SeqCst) + 1;
        self.steps.store(steps, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.events.emit(&ProgressEvent::Advanced { completed: 0, steps });
        if steps == 0 {
            self.finish();
        }
        batch
    }

    /// Record one finished load of the current batch
    pub fn advance(&self) {
        let steps = self.steps.load(Ordering::SeqCst);
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if completed > steps {
            tracing::debug!(completed, steps, "progress beyond batch size");
            return;
        }
        self.events.emit(&ProgressEvent::Advanced { completed, steps });
        if completed == steps {
            self.finish();
        }
    }

    /// Record one finished load of `batch`; ignored once a newer batch started
    pub fn advance_batch(&self, batch: u64) {
        if self.batch.load(Ordering::SeqCst) == batch {
            self.advance();
        }
    }

    fn finish(&self) {
        self.events.emit(&ProgressEvent::Finished);
        self.finished.notify_waiters();
    }

    /// Wait until the current batch is finished
    pub async fn finished(&self) {
        loop {
            let notified = self.finished.notified();
            if self.is_finished() {
                return;
            }
            notified.await;
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst).min(self.steps())
    }

    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    /// Completed share in `0.0..=1.0`; an empty batch counts as done
    pub fn fraction(&self) -> f32 {
        match self.steps() {
            0 => 1.0,
            steps => self.completed() as f32 / steps as f32,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed() == self.steps()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Start a batch from render outcomes. Synchronous outcomes count at once,
    /// pending loads count when they finish, whatever their result.
    pub fn track(self: &Arc<Self>, outcomes: Vec<RenderOutcome>, runtime: &Handle) {
        let batch = self.set_steps(outcomes.len());
        for outcome in outcomes {
            match outcome {
                RenderOutcome::Loading(ticket) => {
                    let progress = self.clone();
                    runtime.spawn(async move {
                        ticket.wait().await;
                        progress.advance_batch(batch);
                    });
                }
                RenderOutcome::Drawn | RenderOutcome::Ignored => self.advance_batch(batch),
            }
        }
    }
}
