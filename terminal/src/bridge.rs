//! # Dual-Queue Bridge
//!
//! The only crossing point between the foreground (render/update) thread and
//! the network driver thread.
//!
//! ```text
//!  foreground thread                          network driver thread
//!  ─────────────────                          ─────────────────────
//!  submit(Request) ──▶ [ request queue ] ──▶ take_requests()
//!  drain()         ◀── [ result queue  ] ◀── publish(Event)
//! ```
//!
//! Each queue sits behind its own `parking_lot::Mutex`. The lock is held only
//! to append one item or to swap the whole queue out for an empty one; all
//! processing happens on the swapped-out local copy with the lock released.
//! Neither side ever waits on network I/O.
//!
//! ## Delivery Guarantees
//!
//! - Every published event is returned by exactly one `drain()` call.
//! - Events come back in publish order.
//! - Requests come back from `take_requests()` in submission order.
//!
//! ## Usage
//!
//! ```rust
//! use chart_terminal::bridge::Bridge;
//! use shared::{Event, Request};
//! use std::sync::Arc;
//!
//! let bridge = Arc::new(Bridge::new());
//! bridge.submit(Request::CancelScan { request_id: 1 });
//! assert_eq!(bridge.take_requests().len(), 1);
//!
//! bridge.publish(Event::ScannerParameters { xml: String::new() });
//! assert_eq!(bridge.drain().len(), 1);
//! assert!(bridge.drain().is_empty());
//! ```

use parking_lot::Mutex;
use shared::{Event, Request};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Two mutex-guarded FIFO queues shared by the foreground and network threads.
///
/// Create one per session and hand an `Arc<Bridge>` to both sides.
#[derive(Debug, Default)]
pub struct Bridge {
    requests: Mutex<VecDeque<Request>>,
    events: Mutex<VecDeque<Event>>,
    counters: Counters,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    taken: AtomicU64,
    published: AtomicU64,
    drained: AtomicU64,
}

/// Point-in-time traffic counters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeStats {
    pub requests_submitted: u64,
    pub requests_taken: u64,
    pub events_published: u64,
    pub events_drained: u64,
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request for the network thread. Callable from any thread.
    pub fn submit(&self, request: Request) {
        tracing::trace!(
            kind = request.kind(),
            request_id = ?request.request_id(),
            "Request submitted"
        );
        self.requests.lock().push_back(request);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Take every queued request, oldest first. Network thread side.
    pub fn take_requests(&self) -> Vec<Request> {
        let local = std::mem::take(&mut *self.requests.lock());
        self.counters
            .taken
            .fetch_add(local.len() as u64, Ordering::Relaxed);
        Vec::from(local)
    }

    /// Hand a completed result to the foreground. Network thread side.
    pub fn publish(&self, event: Event) {
        tracing::trace!(
            kind = event.kind(),
            request_id = ?event.request_id(),
            "Event published"
        );
        self.events.lock().push_back(event);
        self.counters.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Take every published result, oldest first. Foreground side, once per tick.
    pub fn drain(&self) -> Vec<Event> {
        let local = std::mem::take(&mut *self.events.lock());
        if !local.is_empty() {
            self.counters
                .drained
                .fetch_add(local.len() as u64, Ordering::Relaxed);
            tracing::debug!(count = local.len(), "Drained events from bridge");
        }
        Vec::from(local)
    }

    /// Requests waiting for the network thread
    pub fn pending_requests(&self) -> usize {
        self.requests.lock().len()
    }

    /// Results waiting for the foreground thread
    pub fn pending_events(&self) -> usize {
        self.events.lock().len()
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            requests_submitted: self.counters.submitted.load(Ordering::Relaxed),
            requests_taken: self.counters.taken.load(Ordering::Relaxed),
            events_published: self.counters.published.load(Ordering::Relaxed),
            events_drained: self.counters.drained.load(Ordering::Relaxed),
        }
    }
}
