use std::collections::HashMap;

use tracing::debug;

use super::component::ComponentRef;
use super::ActorId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub component: ComponentRef,
    pub handler: String,
}

/// Publish/subscribe registry. Subscription changes are buffered and committed once per
/// frame: all subscriptions first, then all unsubscriptions.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: HashMap<String, Vec<Subscription>>,
    pending_subscribe: Vec<(String, Subscription)>,
    pending_unsubscribe: Vec<(String, Subscription)>,
}

impl EventBus {
    pub fn subscribe(&mut self, event: impl Into<String>, subscription: Subscription) {
        self.pending_subscribe.push((event.into(), subscription));
    }

    pub fn unsubscribe(&mut self, event: impl Into<String>, subscription: Subscription) {
        self.pending_unsubscribe.push((event.into(), subscription));
    }

    pub fn commit(&mut self) {
        for (event, subscription) in self.pending_subscribe.drain(..) {
            self.subscribers.entry(event).or_default().push(subscription);
        }
        for (event, subscription) in self.pending_unsubscribe.drain(..) {
            if let Some(list) = self.subscribers.get_mut(&event) {
                list.retain(|existing| *existing != subscription);
                if list.is_empty() {
                    self.subscribers.remove(&event);
                }
            }
        }
    }

    /// Snapshot of the committed subscribers, safe to iterate while handlers mutate the bus.
    pub fn subscribers(&self, event: &str) -> Vec<Subscription> {
        self.subscribers.get(event).cloned().unwrap_or_default()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.get(event).map_or(0, Vec::len)
    }

    pub(crate) fn forget_actor(&mut self, actor: ActorId) {
        let mut dropped = 0usize;
        self.subscribers.retain(|_, list| {
            let before = list.len();
            list.retain(|subscription| subscription.component.actor != actor);
            dropped += before - list.len();
            !list.is_empty()
        });
        self.pending_subscribe
            .retain(|(_, subscription)| subscription.component.actor != actor);
        if dropped > 0 {
            debug!(actor = %actor, dropped, "event_subscriptions_dropped");
        }
    }

    /// Drops every committed and pending entry of one component.
    pub(crate) fn forget_component(&mut self, component: &ComponentRef) {
        let mut dropped = 0usize;
        self.subscribers.retain(|_, list| {
            let before = list.len();
            list.retain(|subscription| subscription.component != *component);
            dropped += before - list.len();
            !list.is_empty()
        });
        self.pending_subscribe
            .retain(|(_, subscription)| subscription.component != *component);
        self.pending_unsubscribe
            .retain(|(_, subscription)| subscription.component != *component);
        if dropped > 0 {
            debug!(
                actor = %component.actor,
                key = %component.key,
                dropped,
                "event_subscriptions_dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(actor: u64, handler: &str) -> Subscription {
        Subscription {
            component: ComponentRef::new(ActorId(actor), "r0"),
            handler: handler.to_string(),
        }
    }

    #[test]
    fn subscriptions_wait_for_commit() {
        let mut bus = EventBus::default();
        bus.subscribe("Scored", subscription(0, "OnScored"));
        assert_eq!(bus.subscriber_count("Scored"), 0);

        bus.commit();

        assert_eq!(bus.subscribers("Scored"), vec![subscription(0, "OnScored")]);
    }

    #[test]
    fn unsubscribe_in_same_frame_wins() {
        let mut bus = EventBus::default();
        bus.subscribe("Scored", subscription(0, "OnScored"));
        bus.unsubscribe("Scored", subscription(0, "OnScored"));
        bus.commit();

        assert_eq!(bus.subscriber_count("Scored"), 0);
    }

    #[test]
    fn forget_actor_drops_committed_and_pending_entries() {
        let mut bus = EventBus::default();
        bus.subscribe("Scored", subscription(0, "OnScored"));
        bus.subscribe("Scored", subscription(1, "OnScored"));
        bus.commit();
        bus.subscribe("Expired", subscription(0, "OnExpired"));

        bus.forget_actor(ActorId(0));
        bus.commit();

        assert_eq!(bus.subscribers("Scored"), vec![subscription(1, "OnScored")]);
        assert_eq!(bus.subscriber_count("Expired"), 0);
    }

    #[test]
    fn forget_component_leaves_siblings_subscribed() {
        let mut bus = EventBus::default();
        let sibling = Subscription {
            component: ComponentRef::new(ActorId(0), "r1"),
            handler: "OnScored".to_string(),
        };
        bus.subscribe("Scored", subscription(0, "OnScored"));
        bus.subscribe("Scored", sibling.clone());
        bus.commit();
        bus.subscribe("Expired", subscription(0, "OnExpired"));

        bus.forget_component(&ComponentRef::new(ActorId(0), "r0"));
        bus.commit();

        assert_eq!(bus.subscribers("Scored"), vec![sibling]);
        assert_eq!(bus.subscriber_count("Expired"), 0);
    }
}
