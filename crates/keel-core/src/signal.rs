//! Process-wide readiness signals.
//!
//! [`ReadinessBus`] is a small named-signal channel used for the boot
//! handshake between the built-in services and for lifecycle notifications.
//!
//! Two subscription variants exist and they behave differently:
//!
//! | Variant | Delivered | Replay |
//! |---------|-----------|--------|
//! | [`once`](ReadinessBus::once) / [`once_receiver`](ReadinessBus::once_receiver) | the first emit after subscribing, then dropped | none |
//! | [`on`](ReadinessBus::on) | every emit after subscribing | none |
//!
//! Because nothing is replayed, a one-shot subscription only fires if it is
//! registered **before** the signal is emitted.  Initialisers that may run
//! after the signal must check [`has_fired`](ReadinessBus::has_fired) instead.
//!
//! Callbacks for one emit run sequentially in subscription order, outside the
//! subscriber lock, so a callback may subscribe or emit again.
//!
//! # Example
//!
//! ```rust,ignore
//! let bus = ReadinessBus::new();
//! let ready = bus.once_receiver(signals::CHAT_CLIENT_READY);
//! client.start(bus.clone()).await?;
//! ready.await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Well-known signal names.
pub mod signals {
    /// The registry has been initialised.
    pub const REGISTRY_READY: &str = "registry.ready";
    /// The version table has been initialised.
    pub const VERSIONS_READY: &str = "versions.ready";
    /// The loader is ready to accept load requests.
    pub const LOADER_READY: &str = "loader.ready";
    /// The chat client has connected.
    pub const CHAT_CLIENT_READY: &str = "chat-client.ready";
    /// A component finished activating.  Payload: `{ name, kind }`.
    pub const COMPONENT_ACTIVATED: &str = "component.activated";
    /// A component was rolled back after a failed activation.  Payload: `{ name, kind, error }`.
    pub const COMPONENT_ROLLED_BACK: &str = "component.rolled-back";
    /// A chat command was registered.  Payload: `{ component, command }`.
    pub const COMMAND_REGISTERED: &str = "command.registered";
    /// The host is shutting down.
    pub const HOST_SHUTDOWN: &str = "host.shutdown";
}

/// One emitted signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub name: String,
    pub payload: Option<Value>,
}

type OnceCallback = Box<dyn FnOnce(Signal) -> BoxFuture<'static, ()> + Send>;
type PersistentCallback = Arc<dyn Fn(Signal) -> BoxFuture<'static, ()> + Send + Sync>;

enum Subscriber {
    Once(OnceCallback),
    Channel(oneshot::Sender<Signal>),
    Persistent(PersistentCallback),
}

impl Subscriber {
    fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

/// Named readiness signals with one-shot and persistent subscriptions.
///
/// Cheap to share: wrap it in an `Arc` and hand clones to every component.
#[derive(Default)]
pub struct ReadinessBus {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    emitted: Mutex<HashMap<String, usize>>,
}

impl ReadinessBus {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Subscription ────────────────────────────────────────────────────────

    /// Runs `callback` on the next emit of `name`, then forgets it.
    ///
    /// Emits that happened before this call are not replayed.
    pub fn once<F, Fut>(&self, name: &str, callback: F)
    where
        F: FnOnce(Signal) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(
            name,
            Subscriber::Once(Box::new(move |signal| Box::pin(callback(signal)))),
        );
    }

    /// Returns a receiver resolved by the next emit of `name`.
    ///
    /// The channel form of [`once`](Self::once); the same no-replay rule
    /// applies.
    pub fn once_receiver(&self, name: &str) -> oneshot::Receiver<Signal> {
        let (tx, rx) = oneshot::channel();
        self.subscribe(name, Subscriber::Channel(tx));
        rx
    }

    /// Runs `callback` on every subsequent emit of `name`.
    pub fn on<F, Fut>(&self, name: &str, callback: F)
    where
        F: Fn(Signal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe(
            name,
            Subscriber::Persistent(Arc::new(move |signal| Box::pin(callback(signal)))),
        );
    }

    fn subscribe(&self, name: &str, subscriber: Subscriber) {
        self.subscribers
            .lock()
            .entry(name.to_string())
            .or_default()
            .push(subscriber);
        trace!(signal = %name, "Subscribed");
    }

    // ─── Emission ────────────────────────────────────────────────────────────

    /// Emits `name` and awaits every callback it triggers.
    ///
    /// Returns the number of subscribers the signal was delivered to.
    pub async fn emit(&self, name: &str, payload: Option<Value>) -> usize {
        *self.emitted.lock().entry(name.to_string()).or_default() += 1;

        // Take the subscriber list under the lock; one-shots are dropped from
        // the map here, persistent ones are put back before any callback runs.
        let due: Vec<Subscriber> = {
            let mut subscribers = self.subscribers.lock();
            let Some(list) = subscribers.get_mut(name) else {
                debug!(signal = %name, delivered = 0, "Signal emitted");
                return 0;
            };
            let taken = std::mem::take(list);
            list.extend(taken.iter().filter_map(|s| match s {
                Subscriber::Persistent(cb) => Some(Subscriber::Persistent(Arc::clone(cb))),
                _ => None,
            }));
            if list.is_empty() {
                subscribers.remove(name);
            }
            taken
        };

        let signal = Signal {
            name: name.to_string(),
            payload,
        };
        let mut delivered = 0;
        for subscriber in due {
            match subscriber {
                Subscriber::Once(cb) => {
                    cb(signal.clone()).await;
                    delivered += 1;
                }
                Subscriber::Persistent(cb) => {
                    cb(signal.clone()).await;
                    delivered += 1;
                }
                Subscriber::Channel(tx) => {
                    if tx.send(signal.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        trace!(signal = %name, "Receiver dropped before delivery");
                    }
                }
            }
        }

        debug!(signal = %name, delivered, "Signal emitted");
        delivered
    }

    // ─── Inspection ──────────────────────────────────────────────────────────

    /// Returns `true` if `name` has been emitted at least once.
    pub fn has_fired(&self, name: &str) -> bool {
        self.emit_count(name) > 0
    }

    /// Number of times `name` has been emitted.
    pub fn emit_count(&self, name: &str) -> usize {
        self.emitted.lock().get(name).copied().unwrap_or(0)
    }

    /// Number of pending subscribers for `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.subscribers.lock().get(name).map_or(0, Vec::len)
    }

    /// Number of persistent subscribers for `name`.
    pub fn persistent_count(&self, name: &str) -> usize {
        self.subscribers
            .lock()
            .get(name)
            .map_or(0, |list| list.iter().filter(|s| s.is_persistent()).count())
    }
}

impl std::fmt::Debug for ReadinessBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessBus")
            .field("signals", &self.subscribers.lock().len())
            .field("emitted", &*self.emitted.lock())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_once_fires_exactly_once() {
        let bus = ReadinessBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);

        bus.once("x.ready", move |_| async move {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.emit("x.ready", None).await, 1);
        assert_eq!(bus.emit("x.ready", None).await, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.emit_count("x.ready"), 2);
    }

    #[tokio::test]
    async fn test_late_once_is_not_replayed() {
        let bus = ReadinessBus::new();
        bus.emit("x.ready", None).await;

        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        bus.once("x.ready", move |_| async move {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(bus.has_fired("x.ready"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count("x.ready"), 1);
    }

    #[tokio::test]
    async fn test_on_fires_every_time_in_subscription_order() {
        let bus = ReadinessBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        bus.on("tick", move |_| {
            let first = Arc::clone(&first);
            async move { first.lock().push("first") }
        });
        let second = Arc::clone(&order);
        bus.once("tick", move |_| async move { second.lock().push("second") });
        let third = Arc::clone(&order);
        bus.on("tick", move |_| {
            let third = Arc::clone(&third);
            async move { third.lock().push("third") }
        });

        bus.emit("tick", None).await;
        bus.emit("tick", None).await;

        assert_eq!(
            *order.lock(),
            ["first", "second", "third", "first", "third"]
        );
        assert_eq!(bus.persistent_count("tick"), 2);
    }

    #[tokio::test]
    async fn test_once_receiver_gets_payload() {
        let bus = ReadinessBus::new();
        let rx = bus.once_receiver("chat-client.ready");

        bus.emit("chat-client.ready", Some(serde_json::json!({ "guild": "42" })))
            .await;

        let signal = rx.await.unwrap();
        assert_eq!(signal.name, "chat-client.ready");
        assert_eq!(signal.payload.unwrap()["guild"], "42");
    }

    #[tokio::test]
    async fn test_callback_may_subscribe_during_emit() {
        let bus = Arc::new(ReadinessBus::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_bus = Arc::clone(&bus);
        let c = Arc::clone(&counter);
        bus.once("outer", move |_| async move {
            inner_bus.once("outer", move |_| async move {
                c.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.emit("outer", None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        bus.emit("outer", None).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
