//! Aliases for the shared state and callbacks passed between the publishing
//! threads, the dispatch thread and the UI thread.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::event_bus::Message;

/// Mutex-guarded value shared across threads
pub type Shared<T> = Arc<Mutex<T>>;

/// Mutex-guarded FIFO shared across threads
pub type SharedQueue<T> = Arc<Mutex<VecDeque<T>>>;

/// Mutex-guarded list shared across threads
pub type SharedList<T> = Arc<Mutex<Vec<T>>>;

/// One-shot unit of work handed to a UI scheduler
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Subscriber action, invoked with the delivered message.
///
/// Held by the registry snapshot and by the scheduled UI job at the same time.
pub type ReceiverAction = Arc<dyn Fn(&Message) + Send + Sync + 'static>;

/// Deferred call run on the UI thread; an `Err` is logged and dropped.
pub type DeferredFn = Arc<dyn Fn(&Message) -> anyhow::Result<()> + Send + Sync + 'static>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

pub fn shared_queue<T>() -> SharedQueue<T> {
    Arc::new(Mutex::new(VecDeque::new()))
}

pub fn shared_list<T>() -> SharedList<T> {
    Arc::new(Mutex::new(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let jobs: SharedQueue<u8> = shared_queue();
        let producer = jobs.clone();
        producer.lock().push_back(7);
        assert_eq!(jobs.lock().pop_front(), Some(7));

        let seen = shared(Vec::new());
        let writer = Arc::clone(&seen);
        std::thread::spawn(move || writer.lock().push("ui"))
            .join()
            .unwrap();
        assert_eq!(*seen.lock(), vec!["ui"]);
        assert!(shared_list::<u8>().lock().is_empty());
    }
}
