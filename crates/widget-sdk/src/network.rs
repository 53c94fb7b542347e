//! Connectivity monitor — a single online/offline flag with edge-triggered
//! transition listeners.
//!
//! The host integration reports connectivity changes via [`NetworkMonitor::set_online`];
//! listeners fire once per transition, not on every check.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

type TransitionListener = Arc<dyn Fn(bool) + Send + Sync>;

pub struct NetworkMonitor {
    online: AtomicBool,
    listeners: Mutex<Vec<(u64, TransitionListener)>>,
    next_id: AtomicU64,
}

impl NetworkMonitor {
    /// Initial state comes from host-reported connectivity at construction.
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Register a transition listener. Returns a subscription id for
    /// [`NetworkMonitor::unsubscribe`].
    pub fn subscribe(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.listeners.lock().retain(|(listener_id, _)| *listener_id != id);
    }

    /// Report host connectivity. Listeners fire only on an actual
    /// online/offline edge.
    pub fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online == online {
            return;
        }
        debug!(online, "connectivity transition");

        // Invoke outside the lock so a listener may re-subscribe safely.
        let listeners: Vec<TransitionListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(online);
        }
    }
}
