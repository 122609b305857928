use std::cell::RefCell;
use std::rc::Rc;

use consentry_core::{
    ConsentError, CookieJar, CookieOptions, EventKind, JarContext, PolicyDecision, PolicyEvent,
    PolicyName, PolicyRecord, StoreOptions,
};
use consentry_test_support::fixtures::{ManualClock, memory_registry, memory_registry_with};
use consentry_test_support::observers::EventRecorder;

fn record(entries: &[(&str, bool)]) -> PolicyRecord {
    entries
        .iter()
        .map(|(name, accepted)| (PolicyName::new(name), *accepted))
        .collect()
}

#[test]
fn first_open_seeds_record_and_second_open_returns_same_instance() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(["marketing"], StoreOptions::default())
        .expect("open store");
    assert_eq!(
        store.policies(),
        record(&[
            ("essential", true),
            ("usage", false),
            ("settings", false),
            ("marketing", false),
        ])
    );

    let again = registry
        .open(["campaigns"], StoreOptions::default())
        .expect("reopen store");
    assert!(again.ptr_eq(&store));
    assert_eq!(again.extra_policies(), &[PolicyName::new("marketing")]);
    assert_eq!(
        again.is_policy_accepted("campaigns"),
        PolicyDecision::Unknown
    );
}

#[test]
fn set_policy_round_trips_for_non_essential_names() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(["marketing"], StoreOptions::default())
        .expect("open store");

    for name in ["usage", "settings", "marketing", "brand-new"] {
        for accepted in [true, false] {
            store.set_policy(name, accepted).expect("set policy");
            assert_eq!(
                store.is_policy_accepted(name),
                PolicyDecision::from_stored(Some(accepted))
            );
            assert_eq!(
                store.is_policy_accepted("essential"),
                PolicyDecision::Accepted
            );
        }
    }
}

#[test]
fn rejecting_essential_changes_nothing_and_fires_nothing() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    let recorder = EventRecorder::attach_all(&store);
    let before = store.policies();

    store.set_policy("essential", false).expect("no-op");

    assert_eq!(store.policies(), before);
    assert_eq!(
        store.is_policy_accepted("essential"),
        PolicyDecision::Accepted
    );
    assert!(recorder.events().is_empty());
}

#[test]
fn essential_accept_and_reject_notify_without_writing() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    let recorder = EventRecorder::attach_all(&store);
    let before = store.policies();

    store.accept_policy("essential").expect("accept essential");
    store.reject_policy("essential").expect("reject essential");

    assert_eq!(store.policies(), before);
    assert_eq!(
        recorder.events(),
        vec![
            PolicyEvent::PolicyAccepted {
                policy: PolicyName::essential()
            },
            PolicyEvent::PolicyRejected {
                policy: PolicyName::essential()
            },
        ]
    );
}

#[test]
fn bulk_accept_and_reject_cover_every_known_policy() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(["marketing"], StoreOptions::default())
        .expect("open store");

    store.accept_all_policies().expect("accept all");
    assert!(store.policies().iter().all(|(_, accepted)| accepted));
    assert_eq!(store.policies().len(), 4);

    store.reject_all_policies().expect("reject all");
    for (name, accepted) in store.policies().iter() {
        assert_eq!(accepted, name.is_essential(), "unexpected flag for {name}");
    }
}

#[test]
fn change_observers_run_in_registration_order_with_the_change() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    let calls: Rc<RefCell<Vec<(&'static str, PolicyEvent)>>> = Rc::new(RefCell::new(Vec::new()));

    for label in ["first", "second"] {
        let calls = Rc::clone(&calls);
        let _subscription = store.on(EventKind::ChangePolicy, move |event| {
            calls.borrow_mut().push((label, event.clone()));
            Ok(())
        });
    }

    store.accept_policy("usage").expect("accept usage");

    let expected = PolicyEvent::PolicyChanged {
        changes: record(&[("usage", true)]),
    };
    assert_eq!(
        *calls.borrow(),
        vec![("first", expected.clone()), ("second", expected)]
    );
}

#[test]
fn delete_all_clears_the_policy_record() {
    let (jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    store
        .set("theme", "dark", CookieOptions::default())
        .expect("set unrelated cookie");
    let recorder = EventRecorder::attach(&store, &[EventKind::DeleteAllCookies]);

    store.delete_all("/", None).expect("delete all");

    assert!(store.policies().is_empty());
    assert_eq!(store.get("cookies_policy"), None);
    assert!(!store.exists("theme"));
    assert_eq!(jar.cookie_header(), "");
    assert_eq!(
        recorder.events(),
        vec![PolicyEvent::AllCookiesDeleted {
            path: "/".into(),
            domain: None
        }]
    );
}

#[test]
fn repeated_accept_keeps_state_but_fires_every_time() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    let recorder = EventRecorder::attach(&store, &[EventKind::AcceptPolicy]);

    store.accept_policy("usage").expect("first accept");
    let once = store.policies();
    store.accept_policy("usage").expect("second accept");

    assert_eq!(store.policies(), once);
    assert_eq!(
        recorder.kinds(),
        vec![EventKind::AcceptPolicy, EventKind::AcceptPolicy]
    );
}

#[test]
fn reopening_after_destroy_restores_from_the_stored_record() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    store.accept_policy("usage").expect("accept usage");
    let recorder = EventRecorder::attach_all(&store);

    assert!(registry.destroy(&store).expect("destroy"));
    assert_eq!(recorder.kinds(), vec![EventKind::Destroy]);

    let fresh = registry
        .open(["marketing"], StoreOptions::default())
        .expect("reopen store");
    assert!(!fresh.ptr_eq(&store));
    assert_eq!(fresh.is_policy_accepted("usage"), PolicyDecision::Accepted);
    assert_eq!(
        fresh.is_policy_accepted("marketing"),
        PolicyDecision::Rejected
    );

    recorder.clear();
    fresh.reject_policy("usage").expect("reject usage");
    assert!(recorder.events().is_empty());
}

#[test]
fn failing_observer_surfaces_after_the_write() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    let _failing = store.on(EventKind::ChangePolicy, |_| Err("render failed".into()));
    let skipped = EventRecorder::attach(&store, &[EventKind::ChangePolicy]);

    let err = store.accept_policy("usage").expect_err("observer error");

    assert!(matches!(
        err,
        ConsentError::Observer {
            event: EventKind::ChangePolicy,
            ..
        }
    ));
    assert!(skipped.events().is_empty());
    assert_eq!(store.is_policy_accepted("usage"), PolicyDecision::Accepted);
}

#[test]
fn cancelled_observers_stop_receiving_events() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    let recorder = EventRecorder::attach(&store, &[EventKind::RejectPolicy]);

    store.reject_policy("usage").expect("reject");
    recorder.detach();
    store.reject_policy("settings").expect("reject");

    assert_eq!(
        recorder.events(),
        vec![PolicyEvent::PolicyRejected {
            policy: PolicyName::usage()
        }]
    );
}

#[test]
fn delete_scoped_to_another_path_leaves_the_cookie() {
    let (_jar, registry) = memory_registry();
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    store
        .set("theme", "dark", CookieOptions::default())
        .expect("set cookie");

    store.delete("theme", "/elsewhere", None).expect("delete");
    assert_eq!(store.get("theme").as_deref(), Some("dark"));

    store.delete("theme", "/", None).expect("delete");
    assert!(!store.exists("theme"));
}

#[test]
fn stores_share_the_jar_across_policies_keys() {
    let (_jar, registry) = memory_registry();
    let site = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open site store");
    let embed = registry
        .open(["video"], StoreOptions::with_policies_key("embed_policy"))
        .expect("open embed store");

    embed.accept_policy("video").expect("accept video");

    assert!(site.exists("embed_policy"));
    assert_eq!(site.is_policy_accepted("video"), PolicyDecision::Unknown);
    assert_eq!(embed.is_policy_accepted("video"), PolicyDecision::Accepted);
}

#[test]
fn policy_record_expires_with_the_cookie() {
    let clock = ManualClock::new();
    let (_jar, registry) = memory_registry_with(JarContext::default(), &clock);
    let store = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    assert!(!store.policies().is_empty());

    clock.advance(60 * 60 * 24 * 366);
    assert!(store.policies().is_empty());
}

#[test]
fn insecure_documents_need_insecure_stores() {
    let clock = ManualClock::new();
    let context = JarContext {
        secure: false,
        ..JarContext::default()
    };

    let (_jar, registry) = memory_registry_with(context.clone(), &clock);
    let secure = registry
        .open(Vec::<String>::new(), StoreOptions::default())
        .expect("open store");
    assert!(secure.policies().is_empty());

    let (_jar, registry) = memory_registry_with(context, &clock);
    let insecure = registry
        .open(
            Vec::<String>::new(),
            StoreOptions {
                secure: false,
                ..StoreOptions::default()
            },
        )
        .expect("open store");
    assert_eq!(
        insecure.is_policy_accepted("essential"),
        PolicyDecision::Accepted
    );
}
