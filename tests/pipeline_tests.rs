//! Service-level pipeline tests.
//!
//! Exercises the validation pipeline end to end against a real in-memory
//! store: classification, exclusion, dedup, compatibility, audit, and the
//! bulk tallies, without going through HTTP.

use edld::model::{AuditAction, IocType, ListType};
use edld::service::ioc::BULK_MAX;
use edld::service::{ServiceError, exclusion, ioc, list, seed};
use edld::store::Store;

fn store_with_list(name: &str, list_type: ListType) -> (Store, String) {
    let store = Store::memory().unwrap();
    let created = list::create(&store, name, None, list_type, &[]).unwrap();
    (store, created.slug)
}

#[test]
fn cidr_is_canonicalized_before_storage() {
    let (store, slug) = store_with_list("Ranges", ListType::Ip);
    let outcome = ioc::add_ioc(
        &store,
        "198.51.100.77/24",
        std::slice::from_ref(&slug),
        None,
        "test",
    )
    .unwrap();
    // host bits zeroed
    assert_eq!(outcome.ioc.value, "198.51.100.0/24");
    assert_eq!(outcome.ioc.ioc_type, IocType::Cidr);
}

#[test]
fn ip_list_accepts_cidr_but_not_domain() {
    let (store, slug) = store_with_list("Edge Block", ListType::Ip);
    let slugs = vec![slug];

    let cidr = ioc::add_ioc(&store, "203.0.113.0/26", &slugs, None, "test").unwrap();
    assert_eq!(cidr.added_to, slugs);

    let domain = ioc::add_ioc(&store, "bad.example.dev", &slugs, None, "test").unwrap();
    assert!(domain.added_to.is_empty());
    assert_eq!(domain.skipped.len(), 1);
}

#[test]
fn hashes_bypass_exclusion_rules() {
    let store = Store::memory().unwrap();
    seed::seed_builtin_exclusions(&store).unwrap();
    let created = list::create(&store, "Malware Hashes", None, ListType::Hash, &[]).unwrap();

    let sha256 = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    let outcome = ioc::add_ioc(
        &store,
        sha256,
        std::slice::from_ref(&created.slug),
        None,
        "test",
    )
    .unwrap();
    assert_eq!(outcome.ioc.ioc_type, IocType::Sha256);
    assert_eq!(outcome.added_to, vec![created.slug]);
}

#[test]
fn unknown_list_aborts_the_whole_add() {
    let (store, slug) = store_with_list("Known", ListType::Mixed);
    let err = ioc::add_ioc(
        &store,
        "5.6.7.8",
        &[slug, "missing".to_string()],
        None,
        "test",
    )
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    // nothing was committed
    assert!(ioc::find_by_value(&store, "5.6.7.8").unwrap().is_none());
}

#[test]
fn bulk_remove_all_lists_deletes_the_rows() {
    let (store, slug) = store_with_list("Feed", ListType::Mixed);
    let slugs = vec![slug];
    ioc::add_ioc(&store, "1.1.1.1", &slugs, None, "test").unwrap();
    ioc::add_ioc(&store, "2.2.2.2", &slugs, None, "test").unwrap();

    let values = vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()];
    let tally = ioc::bulk_remove(&store, &values, None, true, BULK_MAX, "test").unwrap();
    assert_eq!(tally.removed, vec!["1.1.1.1".to_string()]);
    assert_eq!(tally.not_found, vec!["8.8.8.8".to_string()]);
    assert!(ioc::find_by_value(&store, "1.1.1.1").unwrap().is_none());
    assert!(ioc::find_by_value(&store, "2.2.2.2").unwrap().is_some());
}

#[test]
fn bulk_remove_requires_a_scope() {
    let store = Store::memory().unwrap();
    let err = ioc::bulk_remove(
        &store,
        &["1.2.3.4".to_string()],
        None,
        false,
        BULK_MAX,
        "test",
    )
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}

#[test]
fn oversized_batch_is_rejected_up_front() {
    let (store, slug) = store_with_list("Big", ListType::Ip);
    let values: Vec<String> = (0..=BULK_MAX).map(|i| format!("192.0.2.{i}")).collect();
    let err = ioc::bulk_add(&store, &values, &slug, None, BULK_MAX, "test").unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}

#[test]
fn removing_last_membership_keeps_the_ioc_and_history() {
    let (store, slug) = store_with_list("Only List", ListType::Mixed);
    let outcome = ioc::add_ioc(
        &store,
        "orphan.example.dev",
        std::slice::from_ref(&slug),
        None,
        "test",
    )
    .unwrap();

    assert!(ioc::remove_from_list(&store, outcome.ioc.id, &slug, "test").unwrap());
    // second removal is a no-op, not an error
    assert!(!ioc::remove_from_list(&store, outcome.ioc.id, &slug, "test").unwrap());

    let history = ioc::audit_history(&store, outcome.ioc.id).unwrap();
    let actions: Vec<AuditAction> = history.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Created,
            AuditAction::AddedToList,
            AuditAction::RemovedFromList
        ]
    );
}

#[test]
fn empty_comment_is_rejected() {
    let (store, slug) = store_with_list("Notes", ListType::Mixed);
    let outcome = ioc::add_ioc(
        &store,
        "7.7.7.7",
        std::slice::from_ref(&slug),
        None,
        "test",
    )
    .unwrap();
    let err = ioc::add_comment(&store, outcome.ioc.id, "   ", "test").unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}

#[test]
fn search_scopes_to_one_list() {
    let (store, a) = store_with_list("Alpha", ListType::Mixed);
    let b = list::create(&store, "Beta", None, ListType::Mixed, &[])
        .unwrap()
        .slug;
    ioc::add_ioc(&store, "shared.example.dev", &[a.clone(), b.clone()], None, "test").unwrap();
    ioc::add_ioc(&store, "only-alpha.example.dev", std::slice::from_ref(&a), None, "test").unwrap();

    let all = ioc::search(&store, "example.dev", None, 50).unwrap();
    assert_eq!(all.len(), 2);

    let scoped = ioc::search(&store, "example.dev", Some(&b), 50).unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].ioc.value, "shared.example.dev");
    assert!(scoped[0].lists.contains(&a));
    assert!(scoped[0].lists.contains(&b));
}

#[test]
fn custom_exclusion_blocks_future_adds_without_purge() {
    let (store, slug) = store_with_list("Guarded", ListType::Mixed);
    let slugs = vec![slug];
    ioc::add_ioc(&store, "old.corp.dev", &slugs, None, "test").unwrap();

    let added = exclusion::add(&store, "*.corp.dev", Some("ours"), false, "test").unwrap();
    assert!(added.purged.is_empty());

    // the pre-existing IOC survives, new submissions are blocked
    assert!(ioc::find_by_value(&store, "old.corp.dev").unwrap().is_some());
    let err = ioc::add_ioc(&store, "new.corp.dev", &slugs, None, "test").unwrap_err();
    assert!(matches!(err, ServiceError::ExclusionBlocked { .. }));
}

#[test]
fn duplicate_exclusion_is_rejected() {
    let store = Store::memory().unwrap();
    exclusion::add(&store, "203.0.113.0/24", None, false, "test").unwrap();
    let err = exclusion::add(&store, "203.0.113.0/24", None, false, "test").unwrap_err();
    assert!(matches!(err, ServiceError::Duplicate { .. }));
}
