//! Change notifications for collaborating surfaces.
//!
//! Panels and inspectors subscribe to the editor; the editor emits an event
//! after each completed state change. Subscribers run synchronously, in
//! subscription order, after the mutation has been applied, so a callback
//! always observes the post-change state.

use crate::object::{GroupId, ObjectId};

/// A completed state change, emitted to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    /// An object's locks were engaged.
    Lock { id: ObjectId },
    /// An object's locks were released.
    Unlock { id: ObjectId },
    /// An object's visibility changed.
    Visibility { id: ObjectId, visible: bool },
    /// Selection changed; `None` means the selection was cleared.
    Selection { id: Option<ObjectId> },
    /// An object's properties changed.
    Modification { id: ObjectId },
    /// A group's composition or metadata changed.
    Group { id: GroupId },
}

/// Handle identifying a subscription, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&ChangeEvent)>;

/// Ordered list of change subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it stays registered until unsubscribed.
    pub fn subscribe(&mut self, callback: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscription. Unknown handles are a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    /// Deliver an event to every subscriber, in subscription order.
    pub fn emit(&mut self, event: &ChangeEvent) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
