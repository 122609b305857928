//! Typed observer hub for policy store notifications.
//!
//! # Design
//! - Handlers are grouped per [`EventKind`] and run synchronously in
//!   registration order.
//! - The first handler error stops delivery for that emission and is returned
//!   to the caller of the store operation.
//! - The handler table borrow is released before any handler runs, so handlers
//!   may call back into the store or subscribe further handlers.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::cookie::Cookie;
use crate::error::{BoxError, ConsentError, ConsentResult};
use crate::policy::{PolicyName, PolicyRecord};

/// Result returned by observer callbacks.
pub type ObserverResult = Result<(), BoxError>;

type Handler = Rc<dyn Fn(&PolicyEvent) -> ObserverResult>;

/// Notification categories observers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A cookie was written.
    SetCookie,
    /// A cookie was expired.
    DeleteCookie,
    /// Every visible cookie was expired.
    DeleteAllCookies,
    /// One or more policy decisions changed.
    ChangePolicy,
    /// A single policy was accepted.
    AcceptPolicy,
    /// A single policy was rejected.
    RejectPolicy,
    /// Every known policy was accepted.
    AcceptAllPolicies,
    /// Every known policy except `essential` was rejected.
    RejectAllPolicies,
    /// The store was released from its registry.
    Destroy,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::SetCookie,
        Self::DeleteCookie,
        Self::DeleteAllCookies,
        Self::ChangePolicy,
        Self::AcceptPolicy,
        Self::RejectPolicy,
        Self::AcceptAllPolicies,
        Self::RejectAllPolicies,
        Self::Destroy,
    ];

    /// Event name as exposed to page scripts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SetCookie => "setCookie",
            Self::DeleteCookie => "deleteCookie",
            Self::DeleteAllCookies => "deleteAllCookies",
            Self::ChangePolicy => "changePolicy",
            Self::AcceptPolicy => "acceptPolicy",
            Self::RejectPolicy => "rejectPolicy",
            Self::AcceptAllPolicies => "acceptAllPolicies",
            Self::RejectAllPolicies => "rejectAllPolicies",
            Self::Destroy => "destroy",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Payload delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyEvent {
    /// A cookie write reached the jar.
    CookieSet {
        /// The resolved write.
        cookie: Cookie,
        /// Document-cookie string handed to the jar.
        header: String,
    },
    /// A cookie was expired.
    CookieDeleted {
        /// Cookie name.
        name: String,
        /// Path the delete was scoped to.
        path: String,
        /// Domain the delete was scoped to, if overridden.
        domain: Option<String>,
    },
    /// Every visible cookie was expired.
    AllCookiesDeleted {
        /// Path the deletes were scoped to.
        path: String,
        /// Domain the deletes were scoped to, if overridden.
        domain: Option<String>,
    },
    /// Policy decisions changed; carries only the changed entries for single
    /// updates and the full record for bulk updates.
    PolicyChanged {
        /// Changed decisions.
        changes: PolicyRecord,
    },
    /// A policy was accepted.
    PolicyAccepted {
        /// Accepted policy.
        policy: PolicyName,
    },
    /// A policy was rejected.
    PolicyRejected {
        /// Rejected policy.
        policy: PolicyName,
    },
    /// Every known policy was accepted.
    AllPoliciesAccepted,
    /// Every known policy except `essential` was rejected.
    AllPoliciesRejected,
    /// The store was released from its registry.
    Destroyed,
}

impl PolicyEvent {
    /// Category used to route the event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::CookieSet { .. } => EventKind::SetCookie,
            Self::CookieDeleted { .. } => EventKind::DeleteCookie,
            Self::AllCookiesDeleted { .. } => EventKind::DeleteAllCookies,
            Self::PolicyChanged { .. } => EventKind::ChangePolicy,
            Self::PolicyAccepted { .. } => EventKind::AcceptPolicy,
            Self::PolicyRejected { .. } => EventKind::RejectPolicy,
            Self::AllPoliciesAccepted => EventKind::AcceptAllPolicies,
            Self::AllPoliciesRejected => EventKind::RejectAllPolicies,
            Self::Destroyed => EventKind::Destroy,
        }
    }
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    handlers: BTreeMap<EventKind, Vec<(u64, Handler)>>,
}

/// Synchronous publish/subscribe table owned by one store.
#[derive(Clone, Default)]
pub struct EventHub {
    state: Rc<RefCell<HubState>>,
}

impl EventHub {
    /// Empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, after any existing handlers.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&PolicyEvent) -> ObserverResult + 'static,
    {
        let handler: Handler = Rc::new(handler);
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        state
            .handlers
            .entry(kind)
            .or_default()
            .push((id, handler));
        Subscription {
            id,
            kind,
            hub: Rc::downgrade(&self.state),
        }
    }

    /// Deliver `event` to every handler registered for its kind.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::Observer`] for the first failing handler;
    /// handlers registered after it are not invoked.
    pub fn emit(&self, event: &PolicyEvent) -> ConsentResult<()> {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .state
            .borrow()
            .handlers
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, handler)| Rc::clone(handler)).collect())
            .unwrap_or_default();

        tracing::trace!(event = %kind, observers = handlers.len(), "emitting event");
        for handler in handlers {
            handler(event).map_err(|source| ConsentError::Observer {
                event: kind,
                source,
            })?;
        }
        Ok(())
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn observer_count(&self, kind: EventKind) -> usize {
        self.state
            .borrow()
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        self.state.borrow_mut().handlers.clear();
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        let counts: BTreeMap<&'static str, usize> = state
            .handlers
            .iter()
            .map(|(kind, handlers)| (kind.as_str(), handlers.len()))
            .collect();
        formatter
            .debug_struct("EventHub")
            .field("handlers", &counts)
            .finish()
    }
}

/// Handle to a registered observer.
///
/// Dropping the handle leaves the observer registered; call
/// [`Subscription::cancel`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    kind: EventKind,
    hub: Weak<RefCell<HubState>>,
}

impl Subscription {
    /// Event kind this subscription listens to.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Whether the observer is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.hub.upgrade().is_some_and(|state| {
            state
                .borrow()
                .handlers
                .get(&self.kind)
                .is_some_and(|handlers| handlers.iter().any(|(id, _)| *id == self.id))
        })
    }

    /// Remove the observer. Returns `false` when it was already gone.
    pub fn cancel(&self) -> bool {
        let Some(state) = self.hub.upgrade() else {
            return false;
        };
        let mut state = state.borrow_mut();
        let Some(handlers) = state.handlers.get_mut(&self.kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != self.id);
        before != handlers.len()
    }
}
