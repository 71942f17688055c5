use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::grid::NavGraph;
use crate::pathfind::find_path;
use crate::types::{HeuristicMode, Point};

#[derive(Debug)]
pub struct WorkersError(std::io::Error);

impl fmt::Display for WorkersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to start path workers: {}", self.0)
    }
}

impl std::error::Error for WorkersError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Bounded pool running path searches off the tick loop.
pub struct PathWorkers {
    runtime: Option<Runtime>,
    next_request_id: AtomicU64,
}

impl PathWorkers {
    pub fn new(size: usize) -> Result<Self, WorkersError> {
        let size = size.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name("path-worker")
            .build()
            .map_err(WorkersError)?;
        Ok(Self {
            runtime: Some(runtime),
            next_request_id: AtomicU64::new(1),
        })
    }

    /// Queues a search and returns immediately.
    pub fn submit(
        &self,
        graph: Arc<NavGraph>,
        start: Point,
        goal: Point,
        mode: HeuristicMode,
    ) -> PathTicket {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        if let Some(runtime) = self.runtime.as_ref() {
            runtime.spawn_blocking(move || {
                let path = find_path(&graph, start, goal, mode);
                // The receiver is gone when the ghost has asked for a newer path.
                let _ = tx.send(path);
            });
        }
        PathTicket { request_id, rx }
    }
}

impl Drop for PathWorkers {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum TicketState {
    Pending,
    Ready(Vec<Point>),
}

/// Handle to one outstanding search. Dropping it discards the result.
#[derive(Debug)]
pub struct PathTicket {
    request_id: u64,
    rx: oneshot::Receiver<Vec<Point>>,
}

impl PathTicket {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// A ticket whose answer is whatever the test sends, if anything.
    #[cfg(test)]
    pub(crate) fn unanswered(request_id: u64) -> (oneshot::Sender<Vec<Point>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { request_id, rx })
    }

    /// Non-blocking check-and-take. A worker that went away without an answer
    /// counts as "no path".
    pub fn poll(&mut self) -> TicketState {
        match self.rx.try_recv() {
            Ok(path) => TicketState::Ready(path),
            Err(TryRecvError::Empty) => TicketState::Pending,
            Err(TryRecvError::Closed) => TicketState::Ready(Vec::new()),
        }
    }
}
