//! UI-thread marshaling.
//!
//! Subscriber code never runs on the dispatch thread. The bus hands every
//! action to a [`UiScheduler`], which runs jobs one at a time, in the order
//! they were scheduled, on a single cooperative thread.

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::error::{BusError, Result};
use crate::types::{shared_queue, SharedQueue, UiJob};

/// Single-threaded cooperative executor for subscriber actions
pub trait UiScheduler: Send + Sync {
    /// Queue a job; it runs later, after every job scheduled before it
    fn schedule(&self, job: UiJob);
}

/// Dedicated UI thread draining a job channel
///
/// A panicking job is logged and the thread keeps serving later jobs.
pub struct UiThread {
    sender: Mutex<Option<Sender<UiJob>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl UiThread {
    /// Start the UI thread
    pub fn spawn(name: &str) -> Result<Arc<Self>> {
        let (sender, receiver) = unbounded::<UiJob>();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in receiver.iter() {
                    if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
                        tracing::error!("UI job panicked: {}", panic_message(&*panic));
                    }
                }
                tracing::debug!("UI thread finished");
            })
            .map_err(|source| BusError::SpawnFailed {
                thread: name.to_string(),
                source,
            })?;

        let thread_id = handle.thread().id();
        tracing::debug!("UI thread {} started", name);
        Ok(Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            thread_id,
        }))
    }

    /// Check if the caller is running on this UI thread
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Stop accepting jobs, run the ones already queued, and join
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if self.is_current() {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("UI thread terminated abnormally");
            }
        }
    }
}

impl UiScheduler for UiThread {
    fn schedule(&self, job: UiJob) {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(job).is_err() {
                    tracing::warn!("UI thread gone, job dropped");
                }
            }
            None => tracing::warn!("UI thread shut down, job dropped"),
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for UiThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiThread")
            .field("thread_id", &self.thread_id)
            .field("running", &self.sender.lock().is_some())
            .finish()
    }
}

/// Scheduler whose jobs run when the owning thread pumps it
///
/// Embeds the bus in an existing event loop: the loop calls
/// [`ManualScheduler::run_pending`] on each iteration.
#[derive(Clone)]
pub struct ManualScheduler {
    jobs: SharedQueue<UiJob>,
}

impl ManualScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            jobs: shared_queue(),
        }
    }

    /// Run queued jobs, including ones they schedule, until the queue is empty
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Release the lock before running: jobs may schedule more jobs.
            let next = self.jobs.lock().pop_front();
            let Some(job) = next else {
                return ran;
            };
            job();
            ran += 1;
        }
    }

    /// Pump until `done` holds or `timeout` elapses; returns the last `done`
    pub fn run_until<F>(&self, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Pump for `duration`, running whatever arrives meanwhile
    pub fn run_for(&self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut ran = self.run_pending();
        while Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
            ran += self.run_pending();
        }
        ran
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl UiScheduler for ManualScheduler {
    fn schedule(&self, job: UiJob) {
        self.jobs.lock().push_back(job);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_manual_scheduler_runs_in_order() {
        let scheduler = ManualScheduler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = seen.clone();
            scheduler.schedule(Box::new(move || seen.lock().push(i)));
        }
        assert_eq!(scheduler.pending(), 3);
        assert_eq!(scheduler.run_pending(), 3);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_manual_scheduler_nested_schedule() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let inner = scheduler.clone();
        let c = count.clone();
        scheduler.schedule(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
            let c = c.clone();
            inner.schedule(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ui_thread_runs_jobs_off_caller_thread() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let caller = std::thread::current().id();
        let ui_ref = ui.clone();
        ui.schedule(Box::new(move || {
            tx.send((std::thread::current().id() != caller, ui_ref.is_current()))
                .ok();
        }));

        let (off_caller, on_ui) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(off_caller);
        assert!(on_ui);
        ui.shutdown();
    }

    #[test]
    fn test_ui_thread_survives_panicking_job() {
        let ui = UiThread::spawn("test-ui-panic").unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        ui.schedule(Box::new(|| panic!("boom")));
        let c = count.clone();
        ui.schedule(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        ui.shutdown();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Jobs after shutdown are dropped, not run.
        let c = count.clone();
        ui.schedule(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
