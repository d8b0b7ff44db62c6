use super::container::ContainerId;
use super::slot::SlotRole;

/// Notification emitted after a successful engine operation
///
/// Events are plain values: an observer receives the event and nothing
/// else, so it has no handle through which to call back into the engine
/// mid-operation. Re-entrancy is ruled out by the borrow checker, not by
/// a runtime flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEvent {
    /// A container's slot contents changed
    Changed { container: ContainerId },

    /// A new item entered the container system (pickup, deposit, loot)
    ItemAdded {
        container: ContainerId,
        item_id: String,
        count: u32,
    },

    /// An item was routed straight into its dedicated equipment slot
    AutoEquipped {
        container: ContainerId,
        role: SlotRole,
        item_id: String,
    },
}

/// Subscriber to engine events
///
/// Observers are notified after the mutation has been applied *and*
/// persisted, in subscription order. The engine never depends on anything
/// an observer does.
pub trait ContainerObserver {
    fn on_event(&mut self, event: &ContainerEvent);
}

/// Query surface owned by the interaction collaborator
///
/// The engine consults it only to gate quick transfer against world
/// containers the UI no longer has open; it never reads any other UI
/// state.
pub trait InteractionGate {
    fn is_container_open(&self, container: ContainerId) -> bool;
}

/// Observer that records every event; used by tests and diagnostics
///
/// Clones share the same log (the engine model is single-threaded, so a
/// plain `Rc<RefCell<..>>` is enough), which lets a caller keep a handle
/// after handing the observer to the engine.
#[derive(Default, Clone)]
pub struct EventLog {
    events: std::rc::Rc<std::cell::RefCell<Vec<ContainerEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<ContainerEvent> {
        self.events.borrow().clone()
    }
}

impl ContainerObserver for EventLog {
    fn on_event(&mut self, event: &ContainerEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
