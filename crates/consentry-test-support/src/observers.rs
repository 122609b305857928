//! Observer that records every event it receives.

use std::cell::RefCell;
use std::rc::Rc;

use consentry_core::{EventKind, PolicyEvent, PolicyStore, Subscription};

/// Records events delivered to a store's observers, in delivery order.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<PolicyEvent>>>,
    subscriptions: Rc<RefCell<Vec<Subscription>>>,
}

impl EventRecorder {
    /// Recorder subscribed to every event kind on `store`.
    #[must_use]
    pub fn attach_all(store: &PolicyStore) -> Self {
        Self::attach(store, &EventKind::ALL)
    }

    /// Recorder subscribed to `kinds` on `store`.
    #[must_use]
    pub fn attach(store: &PolicyStore, kinds: &[EventKind]) -> Self {
        let recorder = Self::default();
        for kind in kinds {
            let events = Rc::clone(&recorder.events);
            let subscription = store.on(*kind, move |event| {
                events.borrow_mut().push(event.clone());
                Ok(())
            });
            recorder.subscriptions.borrow_mut().push(subscription);
        }
        recorder
    }

    /// Events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<PolicyEvent> {
        self.events.borrow().clone()
    }

    /// Kinds of the events received so far.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(PolicyEvent::kind).collect()
    }

    /// Forget the events received so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Cancel every subscription held by the recorder.
    pub fn detach(&self) {
        for subscription in self.subscriptions.borrow_mut().drain(..) {
            subscription.cancel();
        }
    }
}
