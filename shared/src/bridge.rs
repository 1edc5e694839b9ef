//! Messaging bridge between the two execution contexts
//!
//! Each direction is an independent unbounded channel: [`Outbox::post`] is
//! fire-and-forget and per-direction ordering is the channel's FIFO order.
//! The receiving side of the panel is wrapped in a [`SubscriptionRegistry`],
//! which attaches a single pump task on the first subscription and tears it
//! down when the last [`Subscription`] goes away.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Create a connected outbox/inbox pair for one direction
pub fn channel<M>() -> (Outbox<M>, Inbox<M>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { tx }, Inbox { rx })
}

/// Sending half of one bridge direction
#[derive(Debug)]
pub struct Outbox<M> {
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Clone for Outbox<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> Outbox<M> {
    /// Send without waiting for, or expecting, any acknowledgement.
    ///
    /// If the receiving context is gone the message is dropped.
    pub fn post(&self, message: M) {
        if self.tx.send(message).is_err() {
            debug!("Bridge receiver is gone, dropping message");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of one bridge direction
#[derive(Debug)]
pub struct Inbox<M> {
    rx: mpsc::UnboundedReceiver<M>,
}

impl<M> Inbox<M> {
    /// Next message in send order, or `None` once every outbox is dropped
    pub async fn recv(&mut self) -> Option<M> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<M> {
        self.rx.try_recv().ok()
    }
}

type Listener<M> = Arc<dyn Fn(&M) + Send + Sync>;

struct RegistryState<M> {
    listeners: BTreeMap<u64, Listener<M>>,
    next_id: u64,
    pump: Option<JoinHandle<()>>,
}

struct Shared<M> {
    state: Mutex<RegistryState<M>>,
    inbox: Arc<tokio::sync::Mutex<Inbox<M>>>,
}

impl<M> Shared<M> {
    fn state(&self) -> MutexGuard<'_, RegistryState<M>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, message: &M) {
        // Snapshot so listeners may (un)subscribe from inside a callback
        let listeners: Vec<Listener<M>> = self.state().listeners.values().cloned().collect();
        for listener in listeners {
            listener(message);
        }
    }

    fn remove(&self, id: u64) {
        let mut state = self.state();
        if state.listeners.remove(&id).is_none() {
            return;
        }
        if state.listeners.is_empty() {
            if let Some(pump) = state.pump.take() {
                pump.abort();
                debug!("Last subscriber left, bridge listener detached");
            }
        }
    }
}

impl<M> Drop for Shared<M> {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pump) = state.pump.take() {
            pump.abort();
        }
    }
}

/// Reference-counted fan-out of one inbox to any number of listeners.
///
/// Subscribing requires a running tokio runtime because the first
/// subscription spawns the pump task.
pub struct SubscriptionRegistry<M> {
    shared: Arc<Shared<M>>,
}

impl<M: Send + 'static> SubscriptionRegistry<M> {
    pub fn new(inbox: Inbox<M>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RegistryState {
                    listeners: BTreeMap::new(),
                    next_id: 0,
                    pump: None,
                }),
                inbox: Arc::new(tokio::sync::Mutex::new(inbox)),
            }),
        }
    }

    /// Register `listener` for every inbound message until the returned
    /// handle is dropped or explicitly unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<M>
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let mut state = self.shared.state();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.insert(id, Arc::new(listener));

        if state.pump.is_none() {
            state.pump = Some(self.spawn_pump());
            debug!("First subscriber arrived, bridge listener attached");
        }

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    fn spawn_pump(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);
        let inbox = Arc::clone(&self.shared.inbox);
        tokio::spawn(async move {
            let mut inbox = inbox.lock().await;
            while let Some(message) = inbox.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.dispatch(&message);
            }
            debug!("Bridge inbox closed");
        })
    }

    /// Whether the pump task is currently installed
    pub fn is_attached(&self) -> bool {
        self.shared.state().pump.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state().listeners.len()
    }
}

/// Handle returned by [`SubscriptionRegistry::subscribe`]
pub struct Subscription<M> {
    id: u64,
    shared: Weak<Shared<M>>,
}

impl<M> Subscription<M> {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_post_preserves_order() {
        let (outbox, mut inbox) = channel();
        for i in 0..5 {
            outbox.post(i);
        }
        drop(outbox);

        let mut received = Vec::new();
        while let Some(value) = inbox.recv().await {
            received.push(value);
        }
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_post_after_receiver_dropped_is_silent() {
        let (outbox, inbox) = channel::<u8>();
        drop(inbox);
        outbox.post(1);
        assert!(outbox.is_closed());
    }

    #[tokio::test]
    async fn test_lazy_attach_and_refcounted_detach() {
        let (outbox, inbox) = channel::<u32>();
        let registry = SubscriptionRegistry::new(inbox);
        assert!(!registry.is_attached());

        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first_hits);
        let first = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(registry.is_attached());

        let counter = Arc::clone(&second_hits);
        let second = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(registry.subscriber_count(), 2);

        outbox.post(1);
        settle().await;
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);

        first.unsubscribe();
        assert!(registry.is_attached());

        outbox.post(2);
        settle().await;
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 2);

        drop(second);
        assert!(!registry.is_attached());
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_reattach_after_detach() {
        let (outbox, inbox) = channel::<&'static str>();
        let registry = SubscriptionRegistry::new(inbox);

        let subscription = registry.subscribe(|_| {});
        drop(subscription);
        assert!(!registry.is_attached());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = registry.subscribe(move |message: &&'static str| {
            sink.lock().unwrap().push(*message);
        });

        outbox.post("hello");
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec!["hello"]);
    }
}
