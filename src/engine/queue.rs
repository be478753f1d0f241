use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::debug;

use super::pass::lock;

#[derive(Default)]
struct QueueState {
    running: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// FIFO gate that lets exactly one pass run at a time.
#[derive(Default)]
pub(crate) struct RunQueue {
    state: Mutex<QueueState>,
}

/// Permission to run a pass. The next waiter is released on drop.
pub(crate) struct Turn {
    queue: Arc<RunQueue>,
}

impl Drop for Turn {
    fn drop(&mut self) {
        self.queue.release();
    }
}

// Hands a turn that arrived after the waiter gave up on to the next waiter.
struct Ticket<'a> {
    queue: &'a RunQueue,
    rx: Option<oneshot::Receiver<()>>,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                self.queue.release();
            }
        }
    }
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(self: &Arc<Self>) -> Turn {
        let rx = {
            let mut state = lock(&self.state);
            if !state.running {
                state.running = true;
                return Turn {
                    queue: self.clone(),
                };
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!("Pass queued, {} waiting", state.waiters.len());
            rx
        };

        let mut ticket = Ticket {
            queue: self.as_ref(),
            rx: Some(rx),
        };
        if let Some(rx) = ticket.rx.as_mut() {
            // the sender is only dropped once its receiver closed, so an error
            // here cannot come from a live waiter
            let _ = rx.await;
        }
        ticket.rx = None;
        Turn {
            queue: self.clone(),
        }
    }

    fn release(&self) {
        let mut state = lock(&self.state);
        while let Some(tx) = state.waiters.pop_front() {
            if tx.send(()).is_ok() {
                return;
            }
            debug!("Skipping abandoned waiter");
        }
        state.running = false;
    }

    /// Calls waiting for their turn.
    pub fn queued(&self) -> usize {
        lock(&self.state)
            .waiters
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }
}
