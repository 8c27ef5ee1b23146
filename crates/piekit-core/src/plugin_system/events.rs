use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::kernel::error::Result;
use crate::plugin_system::context::PluginContext;
use crate::plugin_system::traits::PluginState;

/// Lifecycle events a plugin can subscribe to on another plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginEvent {
    /// The target reached `Ready`
    Available,
    /// The target is about to shut down
    Teardown,
}

impl PluginEvent {
    /// State in which a subscription for this event fires right away.
    pub fn fired_in(&self) -> PluginState {
        match self {
            PluginEvent::Available => PluginState::Ready,
            PluginEvent::Teardown => PluginState::ShutDown,
        }
    }
}

impl fmt::Display for PluginEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginEvent::Available => f.write_str("on_plugin_available"),
            PluginEvent::Teardown => f.write_str("on_teardown"),
        }
    }
}

/// Callback run once, with the subscriber's context, when the event fires.
pub type EventCallback = Box<dyn FnOnce(&PluginContext<'_>) -> Result<()>>;

/// Handle returned by `subscribe`, used to revoke the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Description of a subscription that is still waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSubscription {
    pub subscriber: String,
    pub target: String,
    pub event: PluginEvent,
}

pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) subscriber: String,
    pub(crate) target: String,
    pub(crate) event: PluginEvent,
    pub(crate) callback: EventCallback,
}

/// Plugin states, plugin folders and the flat subscription table.
///
/// Subscriptions are kept in registration order, which is also the order
/// in which callbacks for one target fire.
#[derive(Default)]
pub struct EventTable {
    states: HashMap<String, PluginState>,
    folders: HashMap<String, PathBuf>,
    leaving: HashSet<String>,
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl fmt::Debug for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTable")
            .field("states", &self.states)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, plugin: &str) -> Option<PluginState> {
        self.states.get(plugin).copied()
    }

    pub(crate) fn set_state(&mut self, plugin: &str, state: PluginState) {
        log::debug!("Plugin '{}' is now {}", plugin, state);
        self.states.insert(plugin.to_string(), state);
    }

    pub fn folder(&self, plugin: &str) -> Option<&Path> {
        self.folders.get(plugin).map(PathBuf::as_path)
    }

    pub(crate) fn set_folder(&mut self, plugin: &str, folder: PathBuf) {
        self.folders.insert(plugin.to_string(), folder);
    }

    /// Whether `event` on `target` has already happened. A teardown counts
    /// from the moment it is announced, before the target reaches `ShutDown`.
    pub fn has_fired(&self, target: &str, event: PluginEvent) -> bool {
        match event {
            PluginEvent::Teardown if self.leaving.contains(target) => true,
            _ => self.state(target) == Some(event.fired_in()),
        }
    }

    pub(crate) fn announce_teardown(&mut self, target: &str) {
        self.leaving.insert(target.to_string());
    }

    pub(crate) fn push(
        &mut self,
        subscriber: &str,
        target: &str,
        event: PluginEvent,
        callback: EventCallback,
    ) -> SubscriptionId {
        let id = self.reserve_id();
        self.subscriptions.push(Subscription {
            id,
            subscriber: subscriber.to_string(),
            target: target.to_string(),
            event,
            callback,
        });
        id
    }

    pub(crate) fn reserve_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Revokes a subscription. Returns false if it already fired or was removed.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    /// Removes and returns the subscriptions matching `target` and `event`,
    /// in registration order.
    pub(crate) fn take(&mut self, target: &str, event: PluginEvent) -> Vec<Subscription> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.subscriptions)
            .into_iter()
            .partition(|s| s.target == target && s.event == event);
        self.subscriptions = rest;
        matching
    }

    /// Drops every subscription made by `subscriber`.
    pub(crate) fn drop_subscriber(&mut self, subscriber: &str) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.subscriber != subscriber);
        before - self.subscriptions.len()
    }

    pub fn pending(&self) -> Vec<PendingSubscription> {
        self.subscriptions
            .iter()
            .map(|s| PendingSubscription {
                subscriber: s.subscriber.clone(),
                target: s.target.clone(),
                event: s.event,
            })
            .collect()
    }

    /// Forgets states and subscriptions; folders are kept.
    pub(crate) fn reset(&mut self) {
        self.states.clear();
        self.subscriptions.clear();
        self.leaving.clear();
    }
}
