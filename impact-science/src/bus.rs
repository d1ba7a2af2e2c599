//! Publish/subscribe fan-out for impact observations.
//!
//! The bus carries two independent channels: `science` for observations that
//! reached the space centre (recovered or transmitted), and `impacts` for
//! observations produced at the moment of a high-energy collision. A bus is
//! constructed once per session and shared by `Rc`; nothing here is global.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::observation::Observation;

/// Token identifying a single subscription on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<E> = Rc<dyn Fn(&E)>;

/// Single-topic subscriber list.
///
/// Handlers run synchronously, in subscription order, on the publishing
/// thread. The list is snapshotted before dispatch, so a handler may
/// subscribe or unsubscribe anything during a publish; the change applies to
/// the next publish.
pub struct Channel<E> {
    name: &'static str,
    handlers: RefCell<Vec<(SubscriptionId, Handler<E>)>>,
    next_id: Cell<u64>,
}

impl<E> Channel<E> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Append a handler and return the token that removes it.
    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        log::trace!("{} channel: subscribed {id:?}", self.name);
        id
    }

    /// Remove a handler. Returns `false` when it was not subscribed, which is
    /// not an error.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if removed {
            log::trace!("{} channel: unsubscribed {id:?}", self.name);
        }
        removed
    }

    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.handlers
            .borrow()
            .iter()
            .any(|(existing, _)| *existing == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    /// Deliver `event` to every handler subscribed when the call started.
    /// Returns the number of handlers invoked.
    pub fn publish(&self, event: &E) -> usize {
        let snapshot: Vec<Handler<E>> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }
}

impl<E> fmt::Debug for Channel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Selects one of the two bus channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Observations delivered to the space centre.
    Science,
    /// Observations produced by a high-energy impact.
    Impact,
}

/// The two observation channels shared by a session.
#[derive(Debug)]
pub struct ImpactBus {
    science: Channel<Observation>,
    impacts: Channel<Observation>,
}

impl Default for ImpactBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ImpactBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            science: Channel::new("science"),
            impacts: Channel::new("impact"),
        }
    }

    #[must_use]
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    #[must_use]
    pub const fn channel(&self, kind: ChannelKind) -> &Channel<Observation> {
        match kind {
            ChannelKind::Science => &self.science,
            ChannelKind::Impact => &self.impacts,
        }
    }

    #[must_use]
    pub const fn science(&self) -> &Channel<Observation> {
        &self.science
    }

    #[must_use]
    pub const fn impacts(&self) -> &Channel<Observation> {
        &self.impacts
    }

    pub fn publish_science(&self, observation: &Observation) -> usize {
        self.science.publish(observation)
    }

    pub fn publish_impact(&self, observation: &Observation) -> usize {
        self.impacts.publish(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handlers_run_in_subscription_order() {
        let channel: Channel<u32> = Channel::new("test");
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let seen = Rc::clone(&seen);
            channel.subscribe(move |value: &u32| seen.borrow_mut().push(format!("{tag}{value}")));
        }
        assert_eq!(channel.publish(&7), 3);
        assert_eq!(*seen.borrow(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let channel: Channel<u32> = Channel::new("test");
        let id = channel.subscribe(|_| {});
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        assert!(channel.is_empty());
        assert_eq!(channel.publish(&1), 0);
    }

    #[test]
    fn handler_may_unsubscribe_itself_during_publish() {
        let channel: Rc<Channel<u32>> = Rc::new(Channel::new("test"));
        let own_id: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let calls = Rc::new(Cell::new(0));

        let weak = Rc::downgrade(&channel);
        let id_slot = Rc::clone(&own_id);
        let counter = Rc::clone(&calls);
        let id = channel.subscribe(move |_| {
            counter.set(counter.get() + 1);
            if let (Some(channel), Some(id)) = (weak.upgrade(), id_slot.take()) {
                channel.unsubscribe(id);
            }
        });
        own_id.set(Some(id));

        channel.publish(&1);
        channel.publish(&2);
        assert_eq!(calls.get(), 1);
        assert!(!channel.is_subscribed(id));
    }

    #[test]
    fn mutations_during_publish_apply_to_the_next_publish() {
        let channel: Rc<Channel<u32>> = Rc::new(Channel::new("test"));
        let late_calls = Rc::new(Cell::new(0));
        let victim_calls = Rc::new(Cell::new(0));
        let victim_slot: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

        let weak = Rc::downgrade(&channel);
        let late_counter = Rc::clone(&late_calls);
        let slot = Rc::clone(&victim_slot);
        let added = Rc::new(Cell::new(false));
        channel.subscribe(move |_| {
            let Some(channel) = weak.upgrade() else {
                return;
            };
            if let Some(victim) = slot.get() {
                channel.unsubscribe(victim);
            }
            if !added.replace(true) {
                let late_counter = Rc::clone(&late_counter);
                channel.subscribe(move |_| late_counter.set(late_counter.get() + 1));
            }
        });

        let victim_counter = Rc::clone(&victim_calls);
        let victim = channel.subscribe(move |_| victim_counter.set(victim_counter.get() + 1));
        victim_slot.set(Some(victim));

        // The victim is removed by the first handler but still sees this event.
        assert_eq!(channel.publish(&1), 2);
        assert_eq!(victim_calls.get(), 1);
        assert_eq!(late_calls.get(), 0);

        assert_eq!(channel.publish(&2), 2);
        assert_eq!(victim_calls.get(), 1);
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn bus_channels_are_independent() {
        let bus = ImpactBus::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        bus.impacts()
            .subscribe(move |_| counter.set(counter.get() + 1));
        let observation = Observation::seismic("Mun", 1.0e9, 0.0, 1.0, "seis@Mun");
        assert_eq!(bus.publish_science(&observation), 0);
        assert_eq!(bus.publish_impact(&observation), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.channel(ChannelKind::Impact).len(), 1);
        assert!(bus.channel(ChannelKind::Science).is_empty());
    }
}
