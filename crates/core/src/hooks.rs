// SPDX-FileCopyrightText: © 2025 Reactor Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Hook Manager (C6): a typed event bus with isolated subscriber failures.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::node::NodeDefinition;
use crate::state::EngineLifecycle;

/// Discriminant used to index subscribers without requiring the event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEventKind {
    NodeAdded,
    NodeRemoved,
    NodeUpdated,
    NodeComputeError,
    NodeSkipComputation,
    EngineInitialized,
    EngineStarted,
    EnginePaused,
    EngineResumed,
    EngineStateChanged,
    BeforeDestroy,
    AfterDestroy,
    EngineRestored,
    HealthCheck,
    ErrorThresholdExceeded,
    MemoryThresholdExceeded,
}

/// One lifecycle event, carrying whatever arguments the event names in §4.6.
#[derive(Debug, Clone)]
pub enum HookEvent {
    NodeAdded { id: String },
    NodeRemoved { id: String },
    NodeUpdated { id: String, old: Box<NodeDefinition>, new: Box<NodeDefinition> },
    NodeComputeError { id: String, message: String },
    NodeSkipComputation { id: String },
    EngineInitialized,
    EngineStarted,
    EnginePaused,
    EngineResumed,
    EngineStateChanged { from: EngineLifecycle, to: EngineLifecycle },
    BeforeDestroy,
    AfterDestroy,
    EngineRestored,
    HealthCheck { node_count: usize, active_tasks: usize, pending_skip_hooks: usize, uptime_ms: u64 },
    ErrorThresholdExceeded { count: usize, window_ms: u64 },
    MemoryThresholdExceeded { used_bytes: u64, threshold_bytes: u64 },
}

impl HookEvent {
    #[must_use]
    pub const fn kind(&self) -> HookEventKind {
        match self {
            Self::NodeAdded { .. } => HookEventKind::NodeAdded,
            Self::NodeRemoved { .. } => HookEventKind::NodeRemoved,
            Self::NodeUpdated { .. } => HookEventKind::NodeUpdated,
            Self::NodeComputeError { .. } => HookEventKind::NodeComputeError,
            Self::NodeSkipComputation { .. } => HookEventKind::NodeSkipComputation,
            Self::EngineInitialized => HookEventKind::EngineInitialized,
            Self::EngineStarted => HookEventKind::EngineStarted,
            Self::EnginePaused => HookEventKind::EnginePaused,
            Self::EngineResumed => HookEventKind::EngineResumed,
            Self::EngineStateChanged { .. } => HookEventKind::EngineStateChanged,
            Self::BeforeDestroy => HookEventKind::BeforeDestroy,
            Self::AfterDestroy => HookEventKind::AfterDestroy,
            Self::EngineRestored => HookEventKind::EngineRestored,
            Self::HealthCheck { .. } => HookEventKind::HealthCheck,
            Self::ErrorThresholdExceeded { .. } => HookEventKind::ErrorThresholdExceeded,
            Self::MemoryThresholdExceeded { .. } => HookEventKind::MemoryThresholdExceeded,
        }
    }
}

type Subscriber = Arc<dyn Fn(&HookEvent) + Send + Sync>;

/// A handle returned by [`HookManager::on`], passed back to
/// [`HookManager::unsubscribe`] to remove the subscription.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionId {
    kind: HookEventKind,
    id: u64,
}

/// Typed event bus. Subscribers for a single event are held in subscription
/// order and invoked in that order within one emission; a subscriber that
/// panics is caught and logged, never propagated to the emitter or siblings.
#[derive(Default)]
pub struct HookManager {
    subscribers: Mutex<HashMap<HookEventKind, Vec<(u64, Subscriber)>>>,
    next_id: AtomicU64,
}

impl HookManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to `kind`, returning a handle for `unsubscribe`.
    pub fn on(&self, kind: HookEventKind, handler: impl Fn(&HookEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        subs.entry(kind).or_default().push((id, Arc::new(handler)));
        SubscriptionId { kind, id }
    }

    pub fn unsubscribe(&self, sub: SubscriptionId) {
        let mut subs = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(list) = subs.get_mut(&sub.kind) {
            list.retain(|(id, _)| *id != sub.id);
        }
    }

    #[must_use]
    pub fn has_subscribers(&self, kind: HookEventKind) -> bool {
        let subs = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        subs.get(&kind).is_some_and(|l| !l.is_empty())
    }

    /// Invokes every subscriber for `event.kind()` in subscription order.
    /// A panicking subscriber is isolated: logged and skipped, siblings still run.
    pub fn emit(&self, event: &HookEvent) {
        let kind = event.kind();
        let handlers: Vec<Subscriber> = {
            let subs = self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            subs.get(&kind).map(|l| l.iter().map(|(_, h)| h.clone()).collect()).unwrap_or_default()
        };
        for handler in handlers {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler(event)));
            if result.is_err() {
                tracing::error!(?kind, "hook subscriber panicked; isolated from emitter and siblings");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn subscribers_invoked_in_subscription_order() {
        let hooks = HookManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = order.clone();
        hooks.on(HookEventKind::NodeAdded, move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        hooks.on(HookEventKind::NodeAdded, move |_| o2.lock().unwrap().push(2));
        hooks.emit(&HookEvent::NodeAdded { id: "n1".into() });
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn panicking_subscriber_does_not_stop_siblings() {
        let hooks = HookManager::new();
        let ran = Arc::new(AtomicUsize::new(0));
        hooks.on(HookEventKind::NodeRemoved, |_| panic!("boom"));
        let ran2 = ran.clone();
        hooks.on(HookEventKind::NodeRemoved, move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        hooks.emit(&HookEvent::NodeRemoved { id: "n1".into() });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_subscriber() {
        let hooks = HookManager::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        let sub = hooks.on(HookEventKind::EngineStarted, move |_| {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        hooks.unsubscribe(sub);
        hooks.emit(&HookEvent::EngineStarted);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
