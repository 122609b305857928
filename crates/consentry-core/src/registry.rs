//! Registry of live policy stores, one per policies key.
//!
//! The application owns a single registry and hands out [`PolicyStore`]
//! handles; opening the same key twice yields the same instance.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::config::StoreOptions;
use crate::error::ConsentResult;
use crate::events::PolicyEvent;
use crate::jar::CookieJar;
use crate::policy::PolicyName;
use crate::store::PolicyStore;

/// Owner of every live [`PolicyStore`] over one cookie jar.
pub struct StoreRegistry {
    jar: Rc<dyn CookieJar>,
    stores: RefCell<BTreeMap<String, PolicyStore>>,
}

impl StoreRegistry {
    /// Registry over `jar`.
    #[must_use]
    pub fn new(jar: Rc<dyn CookieJar>) -> Self {
        Self {
            jar,
            stores: RefCell::new(BTreeMap::new()),
        }
    }

    /// Jar shared by every store in the registry.
    #[must_use]
    pub const fn jar(&self) -> &Rc<dyn CookieJar> {
        &self.jar
    }

    /// Open the store for `options.policies_key`.
    ///
    /// When a store for that key is already live it is returned as-is and
    /// `extra_policies` and `options` are ignored. Otherwise a new store is
    /// created and its record seeded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsentError::InvalidOptions`] for unusable options and
    /// any error raised while seeding the record.
    pub fn open<I, S>(&self, extra_policies: I, options: StoreOptions) -> ConsentResult<PolicyStore>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        options.validate()?;
        if let Some(live) = self.get(&options.policies_key) {
            tracing::debug!(
                policies_key = %options.policies_key,
                "reusing live policy store"
            );
            return Ok(live);
        }

        let extra_policies: Vec<PolicyName> =
            extra_policies.into_iter().map(PolicyName::new).collect();
        let key = options.policies_key.clone();
        let store = PolicyStore::create(Rc::clone(&self.jar), extra_policies, options)?;
        self.stores.borrow_mut().insert(key.clone(), store.clone());
        tracing::info!(policies_key = %key, "opened policy store");
        Ok(store)
    }

    /// Live store for `policies_key`.
    #[must_use]
    pub fn get(&self, policies_key: &str) -> Option<PolicyStore> {
        self.stores.borrow().get(policies_key).cloned()
    }

    /// Whether a store is live for `policies_key`.
    #[must_use]
    pub fn contains(&self, policies_key: &str) -> bool {
        self.stores.borrow().contains_key(policies_key)
    }

    /// Keys with a live store, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.stores.borrow().keys().cloned().collect()
    }

    /// Release `store` from the registry, notify its `destroy` observers, and
    /// drop every observer it holds. Stored cookies are left untouched.
    ///
    /// Returns `false` when `store` no longer owns its key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsentError::Observer`] when a `destroy` observer
    /// fails; the store is released and its observers dropped regardless.
    pub fn destroy(&self, store: &PolicyStore) -> ConsentResult<bool> {
        let key = store.policies_key();
        let released = {
            let mut stores = self.stores.borrow_mut();
            if stores.get(key).is_some_and(|live| live.ptr_eq(store)) {
                stores.remove(key);
                true
            } else {
                false
            }
        };
        if !released {
            return Ok(false);
        }

        tracing::info!(policies_key = %key, "destroyed policy store");
        let delivered = store.events().emit(&PolicyEvent::Destroyed);
        store.events().clear();
        delivered.map(|()| true)
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StoreRegistry")
            .field("stores", &self.keys())
            .finish_non_exhaustive()
    }
}
