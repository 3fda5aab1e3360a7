//! Change signal between browsing contexts of one origin

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::shared::messages::{ChangeEvent, ContextId};

/// Announces state changes to subscribers
///
/// Delivery is fire-and-forget and at most once per publish per subscriber.
/// Writers must commit to the store before publishing.
pub trait ChangeSignal: Send + Sync {
    /// Notify every subscriber outside the `from` context
    fn publish(&self, from: ContextId);

    /// Notify only the subscribers inside `context`
    fn notify_local(&self, context: ContextId);

    /// Register a listener for `context`; dropping the subscription removes it
    fn subscribe(&self, context: ContextId) -> Subscription;
}

/// A registered listener
///
/// Both cross-context and in-page events arrive on the same queue.
pub struct Subscription {
    receiver: Receiver<ChangeEvent>,
    poll: Option<Box<dyn Fn() + Send>>,
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

/// How often [`Subscription::next_timeout`] re-polls a polled signal
const POLL_INTERVAL: Duration = Duration::from_millis(25);

impl Subscription {
    /// Build a subscription from its event queue and an unsubscribe hook
    pub fn new(receiver: Receiver<ChangeEvent>, on_drop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            poll: None,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// Attach a hook that pulls external changes into the queue before each read
    pub fn with_poll(mut self, poll: impl Fn() + Send + 'static) -> Self {
        self.poll = Some(Box::new(poll));
        self
    }

    fn poll(&self) {
        if let Some(poll) = &self.poll {
            poll();
        }
    }

    /// Take the next pending event without blocking
    pub fn try_next(&self) -> Option<ChangeEvent> {
        self.poll();
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next event
    pub fn next_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        if self.poll.is_none() {
            return self.receiver.recv_timeout(timeout).ok();
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.try_next() {
                return Some(event);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            if let Ok(event) = self.receiver.recv_timeout(remaining.min(POLL_INTERVAL)) {
                return Some(event);
            }
        }
    }

    /// Take every pending event
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.poll();
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.on_drop.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

struct Subscriber {
    id: u64,
    context: ContextId,
    sender: Sender<ChangeEvent>,
}

#[derive(Default)]
struct HubInner {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl HubInner {
    fn unsubscribe(&self, id: u64) {
        self.subscribers.write().retain(|s| s.id != id);
        debug!("Subscriber {} removed", id);
    }

    fn send_where(&self, event: ChangeEvent, matches: impl Fn(&Subscriber) -> bool) -> usize {
        let subscribers = self.subscribers.read();
        let mut delivered = 0;
        for subscriber in subscribers.iter().filter(|s| matches(s)) {
            if subscriber.sender.send(event).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// In-process signal hub shared by every context of an origin
#[derive(Clone, Default)]
pub struct SignalHub {
    inner: Arc<HubInner>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl ChangeSignal for SignalHub {
    fn publish(&self, from: ContextId) {
        let delivered = self
            .inner
            .send_where(ChangeEvent::Storage, |s| s.context != from);
        trace!("Storage change from {} delivered to {} subscribers", from, delivered);
    }

    fn notify_local(&self, context: ContextId) {
        let delivered = self
            .inner
            .send_where(ChangeEvent::Local, |s| s.context == context);
        trace!("Local change in {} delivered to {} subscribers", context, delivered);
    }

    fn subscribe(&self, context: ContextId) -> Subscription {
        let (sender, receiver) = unbounded();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.write().push(Subscriber {
            id,
            context,
            sender,
        });
        debug!("Subscriber {} added for context {}", id, context);

        let hub: Weak<HubInner> = Arc::downgrade(&self.inner);
        Subscription::new(receiver, move || {
            if let Some(hub) = hub.upgrade() {
                hub.unsubscribe(id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_skips_originating_context() {
        let hub = SignalHub::new();
        let dock = ContextId::new();
        let overlay = ContextId::new();

        let own = hub.subscribe(dock);
        let other = hub.subscribe(overlay);

        hub.publish(dock);

        assert_eq!(own.try_next(), None);
        assert_eq!(other.try_next(), Some(ChangeEvent::Storage));
        assert_eq!(other.try_next(), None);
    }

    #[test]
    fn test_notify_local_stays_in_context() {
        let hub = SignalHub::new();
        let dock = ContextId::new();
        let overlay = ContextId::new();

        let own = hub.subscribe(dock);
        let other = hub.subscribe(overlay);

        hub.notify_local(dock);

        assert_eq!(own.try_next(), Some(ChangeEvent::Local));
        assert_eq!(other.try_next(), None);
    }

    #[test]
    fn test_one_event_per_publish() {
        let hub = SignalHub::new();
        let sub = hub.subscribe(ContextId::new());
        let from = ContextId::new();

        hub.publish(from);
        hub.publish(from);
        hub.publish(from);

        assert_eq!(sub.drain().len(), 3);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = SignalHub::new();
        let sub = hub.subscribe(ContextId::new());
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);

        // Publishing with nobody listening is a no-op
        hub.publish(ContextId::new());
    }

    #[test]
    fn test_subscription_outlives_hub() {
        let hub = SignalHub::new();
        let sub = hub.subscribe(ContextId::new());
        drop(hub);

        assert_eq!(sub.try_next(), None);
        drop(sub);
    }

    #[test]
    fn test_next_timeout_without_events() {
        let hub = SignalHub::new();
        let sub = hub.subscribe(ContextId::new());
        assert_eq!(sub.next_timeout(Duration::from_millis(10)), None);
    }
}
