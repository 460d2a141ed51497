//! Dispatch table from `(channel, component)` to one receiver
//!
//! Registration is scoped: `register` hands back a guard and the entry
//! disappears when the guard is dropped, unless a later registration for
//! the same key has replaced it in the meantime.

use crate::notify::Notifier;
use airshipui_common::{Channel, Envelope, RouteKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// A handler for inbound envelopes of one route
pub trait Receiver: Send + Sync {
    /// The key this receiver is registered under
    fn route(&self) -> RouteKey;

    /// Handle one envelope. Called on the dispatch task, in arrival order.
    fn receive(&self, envelope: &Envelope);
}

/// Outcome of dispatching one envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Shown as a warning without any table lookup
    Alert,
    /// Delivered to the receiver registered for the exact key
    Handled(RouteKey),
    /// Delivered to the channel's `any` receiver
    Fallback(RouteKey),
    /// No receiver; surfaced as a notice
    Unrouted,
    /// The receiver panicked; the panic was contained
    Panicked(RouteKey),
}

struct Slot {
    serial: u64,
    receiver: Arc<dyn Receiver>,
}

struct RouterInner {
    table: RwLock<HashMap<RouteKey, Slot>>,
    next_serial: AtomicU64,
    notifier: Arc<dyn Notifier>,
}

/// Shared dispatch table. Cloning yields another handle to the same table.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                table: RwLock::new(HashMap::new()),
                next_serial: AtomicU64::new(1),
                notifier,
            }),
        }
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.inner.notifier.clone()
    }

    /// Register `receiver` under its route, replacing any previous entry.
    #[must_use = "dropping the registration removes the receiver again"]
    pub fn register(&self, receiver: Arc<dyn Receiver>) -> Registration {
        let key = receiver.route();
        let serial = self.inner.next_serial.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .inner
            .table
            .write()
            .insert(key.clone(), Slot { serial, receiver })
            .is_some();
        debug!("Registered receiver for {} (replaced: {})", key, replaced);
        Registration {
            router: Arc::downgrade(&self.inner),
            key,
            serial,
        }
    }

    pub fn is_registered(&self, key: &RouteKey) -> bool {
        self.inner.table.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver one envelope according to the dispatch rule.
    pub fn dispatch(&self, envelope: &Envelope) -> Delivery {
        if envelope.channel == Channel::Alert {
            let text = envelope
                .error
                .clone()
                .unwrap_or_else(|| envelope.summary());
            self.inner.notifier.warning(&text);
            return Delivery::Alert;
        }

        let exact = envelope.route_key();
        let fallback = RouteKey::any(envelope.channel.clone());
        let found = {
            let table = self.inner.table.read();
            table
                .get(&exact)
                .map(|slot| (slot.receiver.clone(), true))
                .or_else(|| table.get(&fallback).map(|slot| (slot.receiver.clone(), false)))
        };

        let Some((receiver, is_exact)) = found else {
            debug!("No receiver for {}", exact);
            self.print_if_toast(envelope);
            return Delivery::Unrouted;
        };
        let key = if is_exact { exact } else { fallback };

        match catch_unwind(AssertUnwindSafe(|| receiver.receive(envelope))) {
            Ok(()) if is_exact => Delivery::Handled(key),
            Ok(()) => Delivery::Fallback(key),
            Err(panic) => {
                error!("Receiver for {} panicked: {}", key, panic_message(&*panic));
                Delivery::Panicked(key)
            }
        }
    }

    /// Surface an envelope nobody handles
    fn print_if_toast(&self, envelope: &Envelope) {
        match &envelope.error {
            Some(err) => self.inner.notifier.error(err),
            None => self.inner.notifier.info(&envelope.summary()),
        }
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

/// Guard for one registration. Dropping it deregisters the receiver.
pub struct Registration {
    router: Weak<RouterInner>,
    key: RouteKey,
    serial: u64,
}

impl Registration {
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    /// Whether this registration is still the active one for its key
    pub fn is_active(&self) -> bool {
        self.router.upgrade().is_some_and(|inner| {
            inner
                .table
                .read()
                .get(&self.key)
                .is_some_and(|slot| slot.serial == self.serial)
        })
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(inner) = self.router.upgrade() else {
            return;
        };
        let mut table = inner.table.write();
        if table.get(&self.key).is_some_and(|slot| slot.serial == self.serial) {
            table.remove(&self.key);
            debug!("Deregistered receiver for {}", self.key);
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("serial", &self.serial)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;
    use airshipui_common::component;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Notices(Mutex<Vec<(Level, String)>>);

    impl Notifier for Notices {
        fn notify(&self, level: Level, text: &str) {
            self.0.lock().push((level, text.to_string()));
        }
    }

    struct Counter {
        key: RouteKey,
        seen: Mutex<Vec<Envelope>>,
    }

    impl Counter {
        fn new(channel: Channel, component: &str) -> Arc<Self> {
            Arc::new(Self {
                key: RouteKey::new(channel, component),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Receiver for Counter {
        fn route(&self) -> RouteKey {
            self.key.clone()
        }

        fn receive(&self, envelope: &Envelope) {
            self.seen.lock().push(envelope.clone());
        }
    }

    #[test]
    fn test_last_registration_wins_and_old_guard_is_inert() {
        let router = Router::new(Arc::new(Notices::default()));
        let first = Counter::new(Channel::Ctl, component::SECRET);
        let second = Counter::new(Channel::Ctl, component::SECRET);

        let first_reg = router.register(first.clone());
        let second_reg = router.register(second.clone());
        assert_eq!(router.len(), 1);
        assert!(!first_reg.is_active());
        assert!(second_reg.is_active());

        drop(first_reg);
        assert!(router.is_registered(&RouteKey::new(Channel::Ctl, component::SECRET)));

        let env = Envelope::new(Channel::Ctl, component::SECRET);
        assert_eq!(
            router.dispatch(&env),
            Delivery::Handled(RouteKey::new(Channel::Ctl, component::SECRET))
        );
        assert!(first.seen.lock().is_empty());
        assert_eq!(second.seen.lock().len(), 1);

        drop(second_reg);
        assert!(router.is_empty());
    }

    #[test]
    fn test_registration_outliving_router() {
        let router = Router::new(Arc::new(Notices::default()));
        let reg = router.register(Counter::new(Channel::Ui, component::TASK));
        drop(router);
        assert!(!reg.is_active());
        drop(reg);
    }

    #[test]
    fn test_unrouted_error_is_shown_as_error() {
        let notices = Arc::new(Notices::default());
        let router = Router::new(notices.clone());
        let env = Envelope::new(Channel::Ctl, component::IMAGE).with_error("boom");
        assert_eq!(router.dispatch(&env), Delivery::Unrouted);
        assert_eq!(notices.0.lock()[0], (Level::Error, "boom".to_string()));
    }
}
