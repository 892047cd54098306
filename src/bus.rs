use std::sync::{Arc, Mutex};

use crate::category::Category;
use crate::record::ConsentRecord;

pub const COMMENTS_APPROVED: &str = "content:comments-approved";
pub const EMBEDS_APPROVED: &str = "content:embeds-approved";
pub const CONSENT_CHANGED: &str = "consent:changed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    CommentsApproved,
    EmbedsApproved,
    /// Published after every save attempt with the record that was written.
    ConsentChanged(ConsentRecord),
}

impl Signal {
    /// The approval signal for a category; essential content needs none.
    pub fn approved(category: Category) -> Option<Self> {
        match category {
            Category::Essential => None,
            Category::Comments => Some(Signal::CommentsApproved),
            Category::Embeds => Some(Signal::EmbedsApproved),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Signal::CommentsApproved => COMMENTS_APPROVED,
            Signal::EmbedsApproved => EMBEDS_APPROVED,
            Signal::ConsentChanged(_) => CONSENT_CHANGED,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            Signal::CommentsApproved => Some(Category::Comments),
            Signal::EmbedsApproved => Some(Category::Embeds),
            Signal::ConsentChanged(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Signal) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler)>,
}

/// Publish/subscribe channel shared by the manager and the widgets it gates.
///
/// Delivery is synchronous and in subscription order. Nothing is buffered: a
/// handler only sees signals published after it subscribed.
#[derive(Clone, Default)]
pub struct SignalBus {
    inner: Arc<Mutex<Subscribers>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        let mut subs = self.lock();
        let id = SubscriptionId(subs.next_id);
        subs.next_id += 1;
        subs.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Subscribes to the approval signal of one category only.
    pub fn on_approved<F>(&self, category: Category, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(move |signal| {
            if signal.category() == Some(category) {
                handler();
            }
        })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.lock();
        let before = subs.handlers.len();
        subs.handlers.retain(|(sid, _)| *sid != id);
        subs.handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }

    pub fn publish(&self, signal: &Signal) {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<Handler> = self
            .lock()
            .handlers
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        tracing::debug!(signal = signal.name(), subscribers = handlers.len(), "publish");
        for handler in handlers {
            handler(signal);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
