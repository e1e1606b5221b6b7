//! Power events and the listener bus that delivers them.
//!
//! Events are emitted while a device is being mutated and delivered to
//! listeners before the mutating [`PowerModule`](crate::module::PowerModule)
//! call returns. Delivered events are also kept in a history buffer that
//! callers drain at their own pace.

use voltaic_core::fixed::Ticks;
use voltaic_core::id::DeviceId;

/// A power state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// A device's combined powered state flipped.
    PoweredChanged {
        device: DeviceId,
        powered: bool,
        tick: Ticks,
    },
}

/// A passive listener receives events read-only.
pub type PowerListener = Box<dyn FnMut(&PowerEvent)>;

/// Handle returned by [`PowerEventBus::subscribe`]. Consumed on release.
#[derive(Debug, PartialEq, Eq)]
pub struct ListenerHandle {
    id: u64,
}

struct ListenerEntry {
    id: u64,
    listener: PowerListener,
}

#[derive(Default)]
pub struct PowerEventBus {
    listeners: Vec<ListenerEntry>,
    /// Emitted but not yet delivered.
    pending: Vec<PowerEvent>,
    /// Delivered and not yet drained.
    history: Vec<PowerEvent>,
    next_listener: u64,
}

impl std::fmt::Debug for PowerEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerEventBus")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl PowerEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners run in subscription order.
    pub fn subscribe(&mut self, listener: PowerListener) -> ListenerHandle {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push(ListenerEntry { id, listener });
        ListenerHandle { id }
    }

    /// Release a listener. Returns whether it was still registered.
    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != handle.id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queue an event for the next delivery.
    pub fn emit(&mut self, event: PowerEvent) {
        self.pending.push(event);
    }

    /// Hand every pending event to every listener, move it to the history,
    /// and return the delivered batch.
    pub fn deliver(&mut self) -> Vec<PowerEvent> {
        let batch = std::mem::take(&mut self.pending);
        for event in &batch {
            for entry in &mut self.listeners {
                (entry.listener)(event);
            }
        }
        self.history.extend_from_slice(&batch);
        batch
    }

    /// Take every delivered event, oldest first.
    pub fn drain(&mut self) -> Vec<PowerEvent> {
        std::mem::take(&mut self.history)
    }
}
