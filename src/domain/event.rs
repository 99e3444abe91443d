//! Change notifications.
//!
//! Every mutation that actually changes the model produces exactly one
//! [`Event`]. The event is created after the change has been applied, and it
//! carries the previous and the new values so an undo stack can invert it
//! without reading live state.
//!
//! Subsystems queue their events locally. The [`Model`](crate::Model) drains
//! those queues into an [`EventBus`] after each command, and the bus hands
//! them to subscribers in the order the mutations happened.

use std::{collections::VecDeque, fmt, sync::mpsc};

use uuid::Uuid;

use crate::domain::{
    causal::{CausalEntry, CausalFactor, EntryChange},
    component::Rectangle,
    connection::{Anchor, ConnectionType},
    link::{Link, LinkType},
};

/// A change to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The component tree changed.
    Component(ComponentEvent),
    /// A connection between components changed.
    Connection(ConnectionEvent),
    /// The causal factor overlay changed.
    Causal(CausalEvent),
    /// The link registry changed.
    Link(LinkEvent),
}

impl Event {
    /// A short, stable name for the kind of change, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Component(event) => match event {
                ComponentEvent::RootSet { .. } => "root set",
                ComponentEvent::Added { .. } => "component added",
                ComponentEvent::Removed { .. } => "component removed",
                ComponentEvent::Recovered { .. } => "component recovered",
                ComponentEvent::Moved { .. } => "component moved",
                ComponentEvent::LayoutChanged { .. } => "layout changed",
                ComponentEvent::LayoutsSynchronized { .. } => "layouts synchronized",
                ComponentEvent::TextChanged { .. } => "component text changed",
                ComponentEvent::CommentChanged { .. } => "component comment changed",
                ComponentEvent::ControlActionLinked { .. } => "control action linked",
                ComponentEvent::RelativeChanged { .. } => "relative changed",
                ComponentEvent::SafetyCriticalChanged { .. } => "safety critical changed",
                ComponentEvent::UnsafeVariableAdded { .. } => "unsafe variable added",
                ComponentEvent::UnsafeVariableRemoved { .. } => "unsafe variable removed",
            },
            Self::Connection(event) => match event {
                ConnectionEvent::Added { .. } => "connection added",
                ConnectionEvent::Removed { .. } => "connection removed",
                ConnectionEvent::Recovered { .. } => "connection recovered",
                ConnectionEvent::TypeChanged { .. } => "connection type changed",
                ConnectionEvent::SourceChanged { .. } => "connection source changed",
                ConnectionEvent::TargetChanged { .. } => "connection target changed",
            },
            Self::Causal(event) => match event {
                CausalEvent::FactorAdded { .. } => "causal factor added",
                CausalEvent::FactorRemoved { .. } => "causal factor removed",
                CausalEvent::FactorTextChanged { .. } => "causal factor text changed",
                CausalEvent::EntryAdded { .. } => "causal entry added",
                CausalEvent::EntryRemoved { .. } => "causal entry removed",
                CausalEvent::EntryChanged { .. } => "causal entry changed",
                CausalEvent::UseScenariosChanged { .. } => "use scenarios changed",
                CausalEvent::OverlaysCollected { .. } => "causal overlays collected",
            },
            Self::Link(event) => match event {
                LinkEvent::Added { .. } => "link added",
                LinkEvent::Changed { .. } => "link changed",
                LinkEvent::NoteChanged { .. } => "link note changed",
                LinkEvent::Removed { .. } => "link removed",
            },
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Structural and attribute changes in the component tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentEvent {
    /// A new root replaced the whole tree.
    RootSet {
        /// Id of the new root.
        id: Uuid,
    },
    /// A component was created under `parent`.
    Added {
        /// The parent the component was attached to.
        parent: Uuid,
        /// The new component.
        id: Uuid,
    },
    /// A subtree was detached from `parent` and moved to the trash.
    Removed {
        /// The parent the subtree was detached from.
        parent: Uuid,
        /// Root of the removed subtree.
        id: Uuid,
    },
    /// A trashed subtree was reattached under `parent`.
    Recovered {
        /// The parent the subtree was attached to.
        parent: Uuid,
        /// Root of the recovered subtree.
        id: Uuid,
    },
    /// A component changed its position among its siblings.
    Moved {
        /// The parent whose children were reordered.
        parent: Uuid,
        /// The moved component.
        id: Uuid,
        /// Index before the move.
        from: usize,
        /// Index after the move.
        to: usize,
    },
    /// One of the two layouts of a component changed.
    LayoutChanged {
        /// The component.
        id: Uuid,
        /// `true` for the primary layout, `false` for the process-model one.
        step0: bool,
        /// Previous rectangle.
        old: Rectangle,
        /// New rectangle.
        new: Rectangle,
    },
    /// Primary layouts were copied onto secondary layouts.
    LayoutsSynchronized {
        /// The components whose secondary layout changed, with the
        /// secondary rectangle they had before.
        previous: Vec<(Uuid, Rectangle)>,
    },
    /// The text of a component changed.
    TextChanged {
        /// The component.
        id: Uuid,
        /// Previous text.
        old: String,
        /// New text.
        new: String,
    },
    /// The comment of a component changed.
    CommentChanged {
        /// The component.
        id: Uuid,
        /// Previous comment.
        old: String,
        /// New comment.
        new: String,
    },
    /// A control action component was (re)linked.
    ControlActionLinked {
        /// The component.
        id: Uuid,
        /// Previously linked control action.
        old: Option<Uuid>,
        /// Newly linked control action.
        new: Option<Uuid>,
    },
    /// The loose back-reference of a component changed.
    RelativeChanged {
        /// The component.
        id: Uuid,
        /// Previous relative.
        old: Option<Uuid>,
        /// New relative.
        new: Option<Uuid>,
    },
    /// The safety critical flag was toggled.
    SafetyCriticalChanged {
        /// The component.
        id: Uuid,
        /// The new value.
        value: bool,
    },
    /// An unsafe process variable was recorded on a component.
    UnsafeVariableAdded {
        /// The component.
        id: Uuid,
        /// The process variable.
        variable: Uuid,
    },
    /// An unsafe process variable was removed from a component.
    UnsafeVariableRemoved {
        /// The component.
        id: Uuid,
        /// The process variable.
        variable: Uuid,
    },
}

/// Changes to connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection was created.
    Added {
        /// The new connection.
        id: Uuid,
    },
    /// A connection was moved to the trash.
    Removed {
        /// The removed connection.
        id: Uuid,
    },
    /// A trashed connection was restored.
    Recovered {
        /// The restored connection.
        id: Uuid,
    },
    /// The type of a connection changed.
    TypeChanged {
        /// The connection.
        id: Uuid,
        /// Previous type.
        old: ConnectionType,
        /// New type.
        new: ConnectionType,
    },
    /// The source anchor changed.
    SourceChanged {
        /// The connection.
        id: Uuid,
        /// Previous anchor.
        old: Anchor,
        /// New anchor.
        new: Anchor,
    },
    /// The target anchor changed.
    TargetChanged {
        /// The connection.
        id: Uuid,
        /// Previous anchor.
        old: Anchor,
        /// New anchor.
        new: Anchor,
    },
}

/// Changes to the causal factor overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CausalEvent {
    /// A causal factor was appended to a component.
    FactorAdded {
        /// Owning component.
        component: Uuid,
        /// The new factor.
        factor: Uuid,
    },
    /// A causal factor was removed.
    FactorRemoved {
        /// Owning component.
        component: Uuid,
        /// Position the factor had.
        index: usize,
        /// The removed factor, entries included.
        factor: CausalFactor,
    },
    /// The text of a causal factor changed.
    FactorTextChanged {
        /// Owning component.
        component: Uuid,
        /// The factor.
        factor: Uuid,
        /// Previous text.
        old: String,
        /// New text.
        new: String,
    },
    /// An entry was appended to a factor.
    EntryAdded {
        /// Owning component.
        component: Uuid,
        /// Owning factor.
        factor: Uuid,
        /// The new entry.
        entry: Uuid,
    },
    /// An entry was removed from a factor.
    EntryRemoved {
        /// Owning component.
        component: Uuid,
        /// Owning factor.
        factor: Uuid,
        /// Position the entry had.
        index: usize,
        /// The removed entry.
        entry: CausalEntry,
    },
    /// Fields of an entry changed.
    EntryChanged {
        /// Owning component.
        component: Uuid,
        /// Owning factor.
        factor: Uuid,
        /// The changed fields with their previous values.
        previous: EntryChange,
    },
    /// The scenario analysis toggle changed.
    UseScenariosChanged {
        /// The new value.
        value: bool,
    },
    /// Overlays of components that no longer exist were discarded.
    OverlaysCollected {
        /// Ids of the components whose overlays were purged.
        components: Vec<Uuid>,
    },
}

/// Changes to the link registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A fresh link was stored.
    Added {
        /// The stored link.
        link: Link,
    },
    /// One or both sides of a link were rebound.
    Changed {
        /// Category of the link.
        link_type: LinkType,
        /// The link.
        link_id: Uuid,
        /// Previous first side.
        old_a: Option<Uuid>,
        /// Previous second side.
        old_b: Option<Uuid>,
        /// New first side.
        new_a: Option<Uuid>,
        /// New second side.
        new_b: Option<Uuid>,
    },
    /// The note of a link changed.
    NoteChanged {
        /// Category of the link.
        link_type: LinkType,
        /// The link.
        link_id: Uuid,
        /// Previous note.
        old: String,
        /// New note.
        new: String,
    },
    /// Links were deleted. Replaying them as additions undoes the deletion.
    Removed {
        /// Category of the links.
        link_type: LinkType,
        /// The deleted links.
        links: Vec<Link>,
    },
}

impl From<ComponentEvent> for Event {
    fn from(event: ComponentEvent) -> Self {
        Self::Component(event)
    }
}

impl From<ConnectionEvent> for Event {
    fn from(event: ConnectionEvent) -> Self {
        Self::Connection(event)
    }
}

impl From<CausalEvent> for Event {
    fn from(event: CausalEvent) -> Self {
        Self::Causal(event)
    }
}

impl From<LinkEvent> for Event {
    fn from(event: LinkEvent) -> Self {
        Self::Link(event)
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Sink {
    Callback(Box<dyn FnMut(&Event)>),
    Channel(mpsc::Sender<Event>),
}

/// Delivers events to subscribers.
///
/// Events are delivered in posting order; each event reaches every
/// subscriber, in registration order, before the next event is delivered.
/// Subscribers only ever see a shared reference to the event, so they cannot
/// reach back into the model while a delivery is in progress.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriptionId, Sink)>,
    pending: VecDeque<Event>,
    next_id: u64,
    delivered: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending.len())
            .field("delivered", &self.delivered)
            .finish()
    }
}

impl EventBus {
    /// Registers a callback.
    pub fn subscribe(&mut self, callback: impl FnMut(&Event) + 'static) -> SubscriptionId {
        self.register(Sink::Callback(Box::new(callback)))
    }

    /// Registers a channel. Events are cloned into it.
    ///
    /// The subscription is dropped automatically once the receiver is gone.
    pub fn subscribe_channel(&mut self) -> (SubscriptionId, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel();
        (self.register(Sink::Channel(sender)), receiver)
    }

    fn register(&mut self, sink: Sink) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, sink));
        id
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Queues an event for delivery.
    pub fn post(&mut self, event: Event) {
        tracing::trace!(kind = event.kind(), "event posted");
        self.pending.push_back(event);
    }

    /// Number of events waiting for [`flush`](Self::flush).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Total number of events delivered so far.
    #[must_use]
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers every queued event and returns how many were delivered.
    pub fn flush(&mut self) -> usize {
        let mut count = 0;
        while let Some(event) = self.pending.pop_front() {
            self.subscribers.retain_mut(|(_, sink)| match sink {
                Sink::Callback(callback) => {
                    callback(&event);
                    true
                }
                Sink::Channel(sender) => sender.send(event.clone()).is_ok(),
            });
            count += 1;
        }
        self.delivered += count as u64;
        count
    }
}

impl Extend<Event> for EventBus {
    fn extend<T: IntoIterator<Item = Event>>(&mut self, iter: T) {
        for event in iter {
            self.post(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn text_changed(n: u128) -> Event {
        ComponentEvent::TextChanged {
            id: Uuid::from_u128(n),
            old: String::new(),
            new: n.to_string(),
        }
        .into()
    }

    #[test]
    fn delivers_in_posting_order_to_every_subscriber() {
        let mut bus = EventBus::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second"] {
            let log = Rc::clone(&log);
            bus.subscribe(move |event| {
                if let Event::Component(ComponentEvent::TextChanged { new, .. }) = event {
                    log.borrow_mut().push(format!("{name}:{new}"));
                }
            });
        }

        bus.post(text_changed(1));
        bus.post(text_changed(2));
        assert_eq!(bus.pending(), 2);
        assert_eq!(bus.flush(), 2);

        assert_eq!(
            *log.borrow(),
            ["first:1", "second:1", "first:2", "second:2"]
        );
        assert_eq!(bus.pending(), 0);
        assert_eq!(bus.delivered(), 2);
    }

    #[test]
    fn unsubscribed_callbacks_receive_nothing() {
        let mut bus = EventBus::default();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let id = bus.subscribe(move |_| *counter.borrow_mut() += 1);

        bus.post(text_changed(1));
        bus.flush();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.post(text_changed(2));
        bus.flush();

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn channel_subscription_is_dropped_with_receiver() {
        let mut bus = EventBus::default();
        let (_, receiver) = bus.subscribe_channel();

        bus.post(text_changed(7));
        bus.flush();
        assert_eq!(receiver.try_recv().unwrap(), text_changed(7));

        drop(receiver);
        bus.post(text_changed(8));
        bus.flush();
        assert_eq!(bus.subscriber_count(), 0);
    }
}
