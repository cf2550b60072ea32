use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::process::{CancelToken, CommandRunner, Invocation, OutputSink, RunOutcome};

/// Sink owned by a tail's worker thread.
pub type TailSink = Box<dyn OutputSink + Send>;

/// Caller's reference to one started tail.
#[derive(Debug, Clone)]
pub struct TailHandle {
    service: String,
    id: u64,
    cancel: CancelToken,
}

impl TailHandle {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

struct ActiveTail {
    handle: TailHandle,
    worker: JoinHandle<()>,
}

impl ActiveTail {
    /// Kill the follow process and wait for its worker to finish.
    fn stop(self) {
        self.handle.cancel.cancel();
        if self.worker.join().is_err() {
            warn!(service = %self.handle.service, "log tail worker panicked");
        }
    }
}

/// Keeps at most one live "follow logs" process per service.
///
/// Starting a tail for a service that already has one cancels the old tail
/// and waits for its teardown before the new process is launched.
pub struct LogTail {
    runner: Arc<dyn CommandRunner>,
    tails: Mutex<HashMap<String, ActiveTail>>,
    next_id: AtomicU64,
}

impl LogTail {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            tails: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Follow `invocation`'s output for `service`, superseding any live tail.
    ///
    /// Lines go to `sink` from a worker thread as they arrive; there is no
    /// replay. A tail that cannot be launched reports on the error channel.
    pub fn start(&self, service: &str, invocation: Invocation, sink: TailSink) -> TailHandle {
        // Held across teardown and launch so two starts cannot interleave.
        let mut tails = self.lock();
        if let Some(previous) = tails.remove(service) {
            debug!(service, "superseding log tail");
            previous.stop();
        }

        let handle = TailHandle {
            service: service.to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            cancel: CancelToken::new(),
        };

        let runner = Arc::clone(&self.runner);
        let cancel = handle.cancel.clone();
        let label = service.to_string();
        let worker = std::thread::spawn(move || {
            let mut sink = sink;
            match runner.run(&invocation, &mut *sink, &cancel) {
                Ok(RunOutcome::Exited(code)) => debug!(service = %label, code, "log tail ended"),
                Ok(RunOutcome::Cancelled) => debug!(service = %label, "log tail cancelled"),
                Err(e) => {
                    warn!(service = %label, error = %e, "log tail failed");
                    sink.stderr_line(&format!("log tail failed: {e}"));
                }
            }
        });

        info!(service, "log tail started");
        tails.insert(
            service.to_string(),
            ActiveTail {
                handle: handle.clone(),
                worker,
            },
        );
        handle
    }

    /// Stop the tail behind `handle`. Cancelling a handle that was already
    /// cancelled or superseded is a no-op.
    pub fn cancel(&self, handle: &TailHandle) {
        let mut tails = self.lock();
        let current = tails
            .get(&handle.service)
            .is_some_and(|active| active.handle.id == handle.id);
        if current && let Some(active) = tails.remove(&handle.service) {
            active.stop();
            info!(service = %handle.service, "log tail stopped");
        } else {
            handle.cancel.cancel();
        }
    }

    /// Stop whatever tail `service` has. Returns whether one existed.
    pub fn cancel_service(&self, service: &str) -> bool {
        let active = self.lock().remove(service);
        match active {
            Some(active) => {
                active.stop();
                info!(service, "log tail stopped");
                true
            }
            None => false,
        }
    }

    /// Whether `service` has a tail whose process is still being followed.
    pub fn is_active(&self, service: &str) -> bool {
        self.lock()
            .get(service)
            .is_some_and(|active| !active.worker.is_finished())
    }

    pub fn cancel_all(&self) {
        let drained: Vec<ActiveTail> = self.lock().drain().map(|(_, active)| active).collect();
        for active in drained {
            active.stop();
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveTail>> {
        self.tails.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LogTail {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
