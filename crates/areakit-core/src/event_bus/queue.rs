//! FIFO message queue with a wait/notify lock.
//!
//! Producers push without blocking; the single consumer pops, waiting on the
//! queue's condition variable for at most a given timeout when it is empty.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

use super::message::Message;

/// Message FIFO shared by every publisher and the dispatch thread
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: Mutex<VecDeque<Message>>,
    wakeup: Condvar,
}

impl MessageQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and wake the consumer
    pub fn push(&self, message: Message) {
        self.messages.lock().push_back(message);
        self.wakeup.notify_one();
    }

    /// Remove the head message without waiting
    pub fn try_pop(&self) -> Option<Message> {
        self.messages.lock().pop_front()
    }

    /// Remove the head message, waiting up to `timeout` for one to arrive
    ///
    /// Returns `None` on timeout or when woken by [`MessageQueue::wake`] with
    /// nothing queued.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Message> {
        let mut messages = self.messages.lock();
        if messages.is_empty() {
            let _ = self.wakeup.wait_for(&mut messages, timeout);
        }
        messages.pop_front()
    }

    /// Wake a waiting consumer without queueing anything
    pub fn wake(&self) {
        let _guard = self.messages.lock();
        self.wakeup.notify_all();
    }

    /// Drop every queued message
    pub fn clear(&self) -> usize {
        let mut messages = self.messages.lock();
        let dropped = messages.len();
        messages.clear();
        dropped
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::signal::Signal;
    use crate::event_bus::value::{Target, Value};
    use std::sync::Arc;
    use std::time::Instant;

    fn message(n: i64) -> Message {
        Message::new("test", Target::All, Signal::UpdateAll, vec![Value::from(n)])
    }

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new();
        queue.push(message(1));
        queue.push(message(2));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.try_pop().unwrap().related_info(), Some(&Value::Int(1)));
        assert_eq!(queue.try_pop().unwrap().related_info(), Some(&Value::Int(2)));
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_pop_timeout_expires_when_empty() {
        let queue = MessageQueue::new();
        let start = Instant::now();
        assert!(queue.pop_timeout(Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_push_wakes_waiting_consumer() {
        let queue = Arc::new(MessageQueue::new());
        let producer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                queue.push(message(9));
            })
        };

        let start = Instant::now();
        let popped = queue.pop_timeout(Duration::from_secs(5));
        producer.join().unwrap();

        assert_eq!(popped.unwrap().related_info(), Some(&Value::Int(9)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_clear_reports_dropped() {
        let queue = MessageQueue::new();
        queue.push(message(1));
        queue.push(message(2));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }
}
