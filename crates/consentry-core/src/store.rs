//! Consent policy store backed by a cookie jar.
//!
//! # Design
//! - The policy record lives in one cookie (`policies_key`) and every mutation
//!   rewrites it wholesale.
//! - `essential` is forced to `true` at the single persistence boundary
//!   ([`PolicyStore::save_policies`]) so no write path can drop it.
//! - Writes happen before notifications; a failing observer surfaces as an
//!   error after the jar has already been updated.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::config::StoreOptions;
use crate::cookie::{CookieOptions, decode_component, parse_cookie_header};
use crate::error::{ConsentError, ConsentResult};
use crate::events::{EventHub, EventKind, ObserverResult, PolicyEvent, Subscription};
use crate::jar::CookieJar;
use crate::policy::{PolicyDecision, PolicyName, PolicyRecord};

struct StoreInner {
    options: StoreOptions,
    extra_policies: Vec<PolicyName>,
    jar: Rc<dyn CookieJar>,
    events: EventHub,
}

/// Handle to a live policy store. Clones share the same instance.
#[derive(Clone)]
pub struct PolicyStore {
    inner: Rc<StoreInner>,
}

impl PolicyStore {
    /// Build a store and seed its policy record.
    pub(crate) fn create(
        jar: Rc<dyn CookieJar>,
        extra_policies: Vec<PolicyName>,
        options: StoreOptions,
    ) -> ConsentResult<Self> {
        let store = Self {
            inner: Rc::new(StoreInner {
                options,
                extra_policies,
                jar,
                events: EventHub::new(),
            }),
        };
        store.seed()?;
        Ok(store)
    }

    fn seed(&self) -> ConsentResult<()> {
        let mut record: PolicyRecord = self
            .inner
            .extra_policies
            .iter()
            .map(|name| (name.clone(), false))
            .collect();
        record.insert(PolicyName::usage(), false);
        record.insert(PolicyName::settings(), false);
        let stored = self.policies();
        record.merge(&stored);
        let seeded = self.persist(record)?;
        tracing::debug!(
            policies_key = %self.policies_key(),
            policies = seeded.len(),
            restored = stored.len(),
            "seeded policy record"
        );
        Ok(())
    }

    /// Options the store was opened with.
    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    /// Cookie name holding the policy record.
    #[must_use]
    pub fn policies_key(&self) -> &str {
        &self.inner.options.policies_key
    }

    /// Extra policies supplied when the store was opened.
    #[must_use]
    pub fn extra_policies(&self) -> &[PolicyName] {
        &self.inner.extra_policies
    }

    /// Whether both handles refer to the same store instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn events(&self) -> &EventHub {
        &self.inner.events
    }

    /// Every visible cookie, with values decoded. Values that fail to decode
    /// are omitted.
    #[must_use]
    pub fn all(&self) -> BTreeMap<String, String> {
        parse_cookie_header(&self.inner.jar.cookie_header())
            .into_iter()
            .filter_map(|(name, raw)| decode_component(&raw).map(|value| (name, value)))
            .collect()
    }

    /// Whether any visible cookie is named `name`.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        parse_cookie_header(&self.inner.jar.cookie_header()).contains_key(name)
    }

    /// Decoded value of the cookie named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let cookies = parse_cookie_header(&self.inner.jar.cookie_header());
        let raw = cookies.get(name)?;
        let decoded = decode_component(raw);
        if decoded.is_none() {
            tracing::warn!(name, "cookie value is not valid percent-encoded UTF-8");
        }
        decoded
    }

    /// Whether the cookie named `name` currently holds `value`.
    #[must_use]
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.get(name).is_some_and(|current| current == value)
    }

    /// Current policy record; empty when the cookie is absent or malformed.
    #[must_use]
    pub fn policies(&self) -> PolicyRecord {
        PolicyRecord::decode_or_empty(self.get(self.policies_key()).as_deref())
    }

    /// Decision recorded for `name`.
    #[must_use]
    pub fn is_policy_accepted(&self, name: impl Into<PolicyName>) -> PolicyDecision {
        self.policies().decision(&name.into())
    }

    /// Write a cookie. An empty name is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::Jar`] when the jar rejects the write and
    /// [`ConsentError::Observer`] when a `setCookie` observer fails.
    pub fn set(&self, name: &str, value: &str, options: CookieOptions) -> ConsentResult<()> {
        if name.is_empty() {
            return Ok(());
        }
        let cookie = options.resolve(name, value, &self.inner.options);
        self.inner
            .jar
            .write(&cookie)
            .map_err(|source| ConsentError::Jar {
                operation: "set",
                source,
            })?;
        tracing::debug!(
            name,
            max_age = cookie.max_age,
            path = %cookie.path,
            domain = cookie.domain.as_deref().unwrap_or(""),
            "cookie written"
        );
        let header = cookie.to_string();
        self.inner
            .events
            .emit(&PolicyEvent::CookieSet { cookie, header })
    }

    /// Expire the cookie named `name` registered on `path` and `domain`
    /// (the store domain when `None`).
    ///
    /// A delete scoped differently from the original write leaves the cookie
    /// in place.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyStore::set`], plus `deleteCookie` observer failures.
    pub fn delete(&self, name: &str, path: &str, domain: Option<&str>) -> ConsentResult<()> {
        if name.is_empty() {
            return Ok(());
        }
        let domain = domain.map(str::to_string);
        self.set(name, "", CookieOptions::expire(path, domain.clone()))?;
        self.inner.events.emit(&PolicyEvent::CookieDeleted {
            name: name.to_string(),
            path: path.to_string(),
            domain,
        })
    }

    /// Expire every visible cookie, including ones this store did not write.
    ///
    /// The policy record is removed too; open a fresh store to re-seed it.
    ///
    /// # Errors
    ///
    /// Stops at the first failing delete and returns its error.
    ///
    /// Returns the number of cookie names expired.
    pub fn delete_all(&self, path: &str, domain: Option<&str>) -> ConsentResult<usize> {
        let names: Vec<String> = parse_cookie_header(&self.inner.jar.cookie_header())
            .into_keys()
            .collect();
        for name in &names {
            self.delete(name, path, domain)?;
        }
        tracing::info!(deleted = names.len(), path, "deleted all cookies");
        self.inner.events.emit(&PolicyEvent::AllCookiesDeleted {
            path: path.to_string(),
            domain: domain.map(str::to_string),
        })?;
        Ok(names.len())
    }

    /// Persist `record` as the policy cookie, forcing `essential` to `true`.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyStore::set`].
    pub fn save_policies(&self, record: PolicyRecord) -> ConsentResult<()> {
        self.persist(record).map(|_| ())
    }

    fn persist(&self, mut record: PolicyRecord) -> ConsentResult<PolicyRecord> {
        record.assert_essential();
        self.set(self.policies_key(), &record.encode(), CookieOptions::default())?;
        Ok(record)
    }

    /// Record a decision for one policy. `essential` is left untouched and no
    /// event fires for it.
    ///
    /// # Errors
    ///
    /// Returns jar failures and `changePolicy` observer failures.
    pub fn set_policy(&self, name: impl Into<PolicyName>, accepted: bool) -> ConsentResult<()> {
        let name = name.into();
        if name.is_essential() {
            tracing::debug!("ignoring change to the essential policy");
            return Ok(());
        }
        let mut record = self.policies();
        record.insert(name.clone(), accepted);
        self.persist(record)?;
        tracing::info!(policy = %name, accepted, "policy decision recorded");
        self.inner.events.emit(&PolicyEvent::PolicyChanged {
            changes: PolicyRecord::single(name, accepted),
        })
    }

    /// Accept one policy, then notify `acceptPolicy` observers.
    ///
    /// For `essential` the record is left alone but the notification still
    /// fires.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyStore::set_policy`], plus `acceptPolicy` observer
    /// failures.
    pub fn accept_policy(&self, name: impl Into<PolicyName>) -> ConsentResult<()> {
        let name = name.into();
        self.set_policy(name.clone(), true)?;
        self.inner
            .events
            .emit(&PolicyEvent::PolicyAccepted { policy: name })
    }

    /// Reject one policy, then notify `rejectPolicy` observers.
    ///
    /// For `essential` the record is left alone but the notification still
    /// fires.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyStore::set_policy`], plus `rejectPolicy` observer
    /// failures.
    pub fn reject_policy(&self, name: impl Into<PolicyName>) -> ConsentResult<()> {
        let name = name.into();
        self.set_policy(name.clone(), false)?;
        self.inner
            .events
            .emit(&PolicyEvent::PolicyRejected { policy: name })
    }

    /// Accept every policy currently in the record.
    ///
    /// # Errors
    ///
    /// Returns jar failures and `acceptAllPolicies` / `changePolicy` observer
    /// failures.
    pub fn accept_all_policies(&self) -> ConsentResult<()> {
        let record = self.persist(self.policies().with_all(true))?;
        tracing::info!(policies = record.len(), "accepted all policies");
        self.inner.events.emit(&PolicyEvent::AllPoliciesAccepted)?;
        self.inner
            .events
            .emit(&PolicyEvent::PolicyChanged { changes: record })
    }

    /// Reject every policy currently in the record except `essential`.
    ///
    /// # Errors
    ///
    /// Returns jar failures and `rejectAllPolicies` / `changePolicy` observer
    /// failures.
    pub fn reject_all_policies(&self) -> ConsentResult<()> {
        let record = self.persist(self.policies().with_all(false))?;
        tracing::info!(policies = record.len(), "rejected all policies");
        self.inner.events.emit(&PolicyEvent::AllPoliciesRejected)?;
        self.inner
            .events
            .emit(&PolicyEvent::PolicyChanged { changes: record })
    }

    /// Register an observer for `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&PolicyEvent) -> ObserverResult + 'static,
    {
        self.inner.events.subscribe(kind, handler)
    }
}

impl fmt::Debug for PolicyStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PolicyStore")
            .field("options", &self.inner.options)
            .field("extra_policies", &self.inner.extra_policies)
            .field("events", &self.inner.events)
            .finish_non_exhaustive()
    }
}
