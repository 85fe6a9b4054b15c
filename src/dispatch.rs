//! Hand-off point between the single-threaded dashboard state and the
//! collaborators that may block.
//!
//! The coordinator enqueues [`Job`]s and later pulls the matching
//! [`Completion`]s back on its own thread. No dashboard state is ever touched
//! from a worker.

use crate::backend::{DashboardId, DashboardStore, ExecutorError, PersistenceError, QueryExecutor};
use crate::dashboard::config::DashboardDocument;
use crate::dashboard::query::QueryResult;
use crate::dashboard::widgets::{FetchTicket, WidgetId};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum Job {
    Query {
        dataset_id: String,
        ticket: FetchTicket,
    },
    /// `generation` identifies the dashboard session that issued the save.
    Save {
        generation: u64,
        document: DashboardDocument,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Query {
        widget: WidgetId,
        seq: u64,
        result: Result<QueryResult, ExecutorError>,
    },
    Saved {
        generation: u64,
        result: Result<DashboardId, PersistenceError>,
    },
}

pub trait Dispatcher: Send {
    fn dispatch(&mut self, job: Job);
    /// Completions that have arrived since the last call, without blocking.
    fn drain(&mut self) -> Vec<Completion>;
}

/// Runs every job on its own worker thread.
pub struct ThreadedDispatcher {
    executor: Arc<dyn QueryExecutor>,
    store: Arc<dyn DashboardStore>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    pending: usize,
}

impl ThreadedDispatcher {
    pub fn new(executor: Arc<dyn QueryExecutor>, store: Arc<dyn DashboardStore>) -> Self {
        let (tx, rx) = channel();
        Self {
            executor,
            store,
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Block until every dispatched job has reported back or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Vec<Completion> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(completion) => {
                    self.pending -= 1;
                    out.push(completion);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending = 0;
                    break;
                }
            }
        }
        out
    }
}

impl Dispatcher for ThreadedDispatcher {
    fn dispatch(&mut self, job: Job) {
        let tx = self.tx.clone();
        self.pending += 1;
        match job {
            Job::Query { dataset_id, ticket } => {
                let executor = Arc::clone(&self.executor);
                std::thread::spawn(move || {
                    let result = executor.run_query(&dataset_id, &ticket.request);
                    let _ = tx.send(Completion::Query {
                        widget: ticket.widget,
                        seq: ticket.seq,
                        result,
                    });
                });
            }
            Job::Save {
                generation,
                document,
            } => {
                let store = Arc::clone(&self.store);
                std::thread::spawn(move || {
                    let _ = tx.send(Completion::Saved {
                        generation,
                        result: store.save(&document),
                    });
                });
            }
        }
    }

    fn drain(&mut self) -> Vec<Completion> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(completion) => {
                    self.pending = self.pending.saturating_sub(1);
                    out.push(completion);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}
