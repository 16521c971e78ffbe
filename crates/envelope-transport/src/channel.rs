//! # Ambient Channel
//!
//! In-process stand-in for a host's shared messaging object: a broadcast
//! medium every context can post to and listen on.
//!
//! ```text
//! ┌───────────────┐  post_message()   ┌────────────────┐
//! │ child context │ ────────────────► │ parent channel │ ──► listener 1
//! └───────────────┘                   │                │ ──► listener 2
//!                                     └────────────────┘
//! ```
//!
//! The channel is shared and externally owned. Listeners are invoked
//! outside the table lock, so a listener may post or deregister while it
//! runs.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Identifier returned by [`AmbientChannel::add_listener`].
pub type ListenerId = u64;

/// One delivery on the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// The posted value.
    pub data: Value,
    /// Origin of the posting context.
    pub origin: String,
    /// Destination discriminator supplied by the poster.
    pub target_origin: String,
}

type Listener = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

struct ChannelInner {
    name: String,
    listeners: RwLock<BTreeMap<ListenerId, Listener>>,
    next_listener: AtomicU64,
    events_posted: AtomicU64,
}

/// Shared broadcast channel. Clones refer to the same channel.
#[derive(Clone)]
pub struct AmbientChannel {
    inner: Arc<ChannelInner>,
}

impl AmbientChannel {
    /// Create a channel labelled `name` (used in logs).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                name: name.into(),
                listeners: RwLock::new(BTreeMap::new()),
                next_listener: AtomicU64::new(1),
                events_posted: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Register a listener for every subsequent event.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&MessageEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().insert(id, Arc::new(listener));
        trace!(channel = %self.inner.name, listener = id, "Listener added");
        id
    }

    /// Deregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = self.inner.listeners.write().remove(&id).is_some();
        trace!(channel = %self.inner.name, listener = id, removed, "Listener removed");
        removed
    }

    /// Broadcast `data` to every listener registered at the time of the
    /// call. Returns the number of listeners reached.
    pub fn post_message(&self, data: Value, target_origin: &str, source_origin: &str) -> usize {
        self.inner.events_posted.fetch_add(1, Ordering::Relaxed);

        let listeners: Vec<Listener> = self.inner.listeners.read().values().cloned().collect();
        if listeners.is_empty() {
            trace!(channel = %self.inner.name, origin = source_origin, "Message posted with no listeners");
            return 0;
        }

        let event = MessageEvent {
            data,
            origin: source_origin.to_string(),
            target_origin: target_origin.to_string(),
        };
        for listener in &listeners {
            listener(&event);
        }

        trace!(
            channel = %self.inner.name,
            origin = source_origin,
            target_origin,
            receivers = listeners.len(),
            "Message posted"
        );
        listeners.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Total posts, including those that reached nobody.
    #[must_use]
    pub fn events_posted(&self) -> u64 {
        self.inner.events_posted.load(Ordering::Relaxed)
    }

    /// Whether both handles refer to the same channel.
    #[must_use]
    pub fn same_channel(&self, other: &AmbientChannel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for AmbientChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientChannel")
            .field("name", &self.inner.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// An execution context: its own channel plus its parent's.
///
/// A top-level context is its own parent.
#[derive(Debug, Clone)]
pub struct MessageContext {
    origin: String,
    channel: AmbientChannel,
    parent: AmbientChannel,
}

impl MessageContext {
    /// A context with no enclosing context.
    pub fn top_level(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        let channel = AmbientChannel::new(origin.clone());
        Self {
            origin,
            parent: channel.clone(),
            channel,
        }
    }

    /// A context nested inside `parent`.
    pub fn child_of(parent: &MessageContext, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            channel: AmbientChannel::new(origin.clone()),
            parent: parent.channel.clone(),
            origin,
        }
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The channel this context receives on.
    #[must_use]
    pub fn channel(&self) -> &AmbientChannel {
        &self.channel
    }

    /// The enclosing context's channel.
    #[must_use]
    pub fn parent(&self) -> &AmbientChannel {
        &self.parent
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.channel.same_channel(&self.parent)
    }
}
