//! Fan-out of published messages to any number of subscribers.
//!
//! Each subscriber owns a bounded channel. Publishing never blocks: a full
//! buffer drops the message for that subscriber only, and a subscriber whose
//! receiver is gone is pruned on the next publish.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Opaque subscriber identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug)]
struct Registry<T> {
    next_id: u64,
    senders: HashMap<SubscriptionId, Sender<T>>,
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    // Publishing cannot leave the registry half-updated, so a poisoned lock is safe to reuse
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A registry of subscribers for one message type.
#[derive(Debug)]
pub struct Broadcaster<T> {
    registry: Arc<Mutex<Registry<T>>>,
    capacity: usize,
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            capacity: self.capacity,
        }
    }
}

impl<T: Clone> Broadcaster<T> {
    /// `capacity` is the per-subscriber buffer (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                senders: HashMap::new(),
            })),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = bounded(self.capacity);
        let mut registry = lock(&self.registry);
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.senders.insert(id, sender);
        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `message` to every subscriber. Returns how many accepted it.
    pub fn publish(&self, message: T) -> usize {
        let mut registry = lock(&self.registry);
        let mut delivered = 0;
        let mut gone = Vec::new();

        for (id, sender) in &registry.senders {
            match sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(subscriber = id.0, "subscriber buffer full; message dropped");
                }
                Err(TrySendError::Disconnected(_)) => gone.push(*id),
            }
        }

        for id in gone {
            registry.senders.remove(&id);
            tracing::debug!(subscriber = id.0, "pruned disconnected subscriber");
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).senders.len()
    }
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    id: SubscriptionId,
    receiver: Receiver<T>,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn receiver(&self) -> &Receiver<T> {
        &self.receiver
    }

    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Stop receiving. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).senders.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_receives() {
        let hub = Broadcaster::new(4);
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_ne!(a.id(), b.id());

        assert_eq!(hub.publish(7u32), 2);
        assert_eq!(a.try_recv(), Ok(7));
        assert_eq!(b.try_recv(), Ok(7));
    }

    #[test]
    fn test_unsubscribe_removes_subscriber() {
        let hub = Broadcaster::new(4);
        let a = hub.subscribe();
        let b = hub.subscribe();
        a.unsubscribe();
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(hub.publish(1u32), 1);
        assert_eq!(b.try_recv(), Ok(1));
    }

    #[test]
    fn test_full_subscriber_does_not_block_others() {
        let hub = Broadcaster::new(1);
        let slow = hub.subscribe();
        let fast = hub.subscribe();

        assert_eq!(hub.publish(1u32), 2);
        assert_eq!(fast.try_recv(), Ok(1));

        // `slow` never drained, so only `fast` takes the second message
        assert_eq!(hub.publish(2u32), 1);
        assert_eq!(fast.try_recv(), Ok(2));
        assert_eq!(slow.try_recv(), Ok(1));
        assert!(slow.try_recv().is_err());
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub: Broadcaster<u32> = Broadcaster::new(1);
        assert_eq!(hub.publish(1), 0);
    }

    #[test]
    fn test_subscription_outlives_hub() {
        let hub = Broadcaster::new(1);
        let sub = hub.subscribe();
        hub.publish(5u32);
        drop(hub);
        assert_eq!(sub.try_recv(), Ok(5));
        drop(sub);
    }
}
