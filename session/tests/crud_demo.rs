//! End-to-end unit-of-work behavior over a seeded in-memory store.

use chrono::NaiveDate;
use donordb_core::{Donator, DonatorId, Province, ProvinceId};
use donordb_query::{Direction, Query};
use donordb_session::{Database, MutationError, SessionError, TrackKey};
use donordb_store::MemoryStore;
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Three provinces and five donators; Shandong's donators total 80.
fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    let shandong = store.seed_province(Province::new("Shandong"));
    let guangdong = store.seed_province(Province::new("Guangdong"));
    let zhejiang = store.seed_province(Province::new("Zhejiang"));
    store.seed_donator(Donator::with_province(
        "Alice",
        Decimal::from(50),
        date(2016, 5, 30),
        shandong,
    ));
    store.seed_donator(Donator::with_province(
        "Bob",
        Decimal::from(30),
        date(2016, 5, 25),
        shandong,
    ));
    store.seed_donator(Donator::with_province(
        "Carol",
        Decimal::from(60),
        date(2016, 6, 2),
        guangdong,
    ));
    store.seed_donator(Donator::with_province(
        "Dave",
        Decimal::from(25),
        date(2016, 6, 10),
        guangdong,
    ));
    store.seed_donator(Donator::with_province(
        "Erin",
        Decimal::from(12),
        date(2016, 7, 1),
        zhejiang,
    ));
    store
}

fn database() -> Database<MemoryStore> {
    Database::new(seeded_store())
}

#[test]
fn test_navigation_is_bidirectionally_consistent() {
    // GIVEN
    let db = database();
    let uow = db.open_unit_of_work();
    let shandong = ProvinceId::new(1);

    // WHEN resolving the relationship from both sides
    let via_navigator = uow.navigator().donators_of(shandong).unwrap();
    let via_filter = uow
        .donators()
        .filter(move |d| d.province_id == Some(shandong))
        .collect()
        .unwrap();

    // THEN both directions agree
    assert_eq!(via_navigator, via_filter);
    assert_eq!(via_navigator.len(), 2);
}

#[test]
fn test_ordered_paging_is_deterministic() {
    // GIVEN a paging pipeline over ordered donators
    let db = database();
    let uow = db.open_unit_of_work();
    let page = uow
        .donators()
        .order_by(|d| d.id, Direction::Ascending)
        .skip(2)
        .take(3);

    // WHEN materialized twice without intervening mutation
    let first = page.collect().unwrap();
    let second = page.collect().unwrap();

    // THEN both runs return the same rows
    assert_eq!(first, second);
    let ids: Vec<_> = first.iter().map(|d| d.id.unwrap().value()).collect();
    assert_eq!(ids, vec![3, 4, 5]);

    // AND the minimal example holds
    let picked = Query::from_vec(vec![1, 2, 3]).skip(1).take(1).collect().unwrap();
    assert_eq!(picked, vec![2]);
}

#[test]
fn test_group_by_partitions_are_exhaustive_and_disjoint() {
    // GIVEN
    let db = database();
    let uow = db.open_unit_of_work();

    // WHEN grouping donators by province
    let groups = uow
        .donators()
        .group_by(|d| d.province_id)
        .collect()
        .unwrap();

    // THEN every donator lands in exactly one group
    let total: usize = groups.iter().map(|g| g.elements.len()).sum();
    assert_eq!(total, 5);
    for (i, group) in groups.iter().enumerate() {
        for other in &groups[i + 1..] {
            assert_ne!(group.key, other.key);
        }
        for donator in &group.elements {
            assert_eq!(donator.province_id, group.key);
        }
    }
}

#[test]
fn test_cascade_delete_commits_parent_and_children_together() {
    // GIVEN
    let db = database();
    let uow = db.open_unit_of_work();
    let shandong = ProvinceId::new(1);

    // WHEN the province is removed and committed
    uow.remove_province(shandong).unwrap();
    let summary = uow.commit().unwrap();

    // THEN one commit removed the parent and both children
    assert_eq!(summary.provinces_removed, 1);
    assert_eq!(summary.donators_removed, 2);

    // AND a fresh unit of work sees no reference to the former id
    let fresh = db.open_unit_of_work();
    let orphans = fresh
        .donators()
        .filter(move |d| d.province_id == Some(shandong))
        .count()
        .unwrap();
    assert_eq!(orphans, 0);
    assert_eq!(fresh.find_province(shandong).unwrap(), None);
}

#[test]
fn test_cascade_disabled_rejects_and_leaves_store_unchanged() {
    // GIVEN cascade disabled
    let db = database();
    let uow = db.open_unit_of_work();
    uow.set_cascade_delete(false);

    // WHEN removing a province that still has donators
    let result = uow.remove_province(ProvinceId::new(1));

    // THEN the removal is rejected
    assert!(matches!(
        result,
        Err(SessionError::Mutation(
            MutationError::ConstraintViolation { children: 2, .. }
        ))
    ));

    // AND committing applies nothing
    let summary = uow.commit().unwrap();
    assert!(summary.is_empty());
    let fresh = db.open_unit_of_work();
    assert_eq!(fresh.provinces().count().unwrap(), 3);
    assert_eq!(fresh.donators().count().unwrap(), 5);
}

#[test]
fn test_filtered_sum_over_province_donations() {
    // GIVEN
    let db = database();
    let uow = db.open_unit_of_work();
    let nav = uow.navigator();

    // WHEN summing donations navigated from the Shandong province
    let total = uow
        .provinces()
        .filter(|p| p.name == "Shandong")
        .navigate_many(move |p| match p.id {
            Some(id) => nav.donators_of(id),
            None => Ok(Vec::new()),
        })
        .sum(|d| d.amount)
        .unwrap();

    // THEN
    assert_eq!(total, Decimal::from(80));
}

#[test]
fn test_group_join_pairs_unmatched_left_with_empty_group() {
    // GIVEN a province with no donators
    let db = database();
    let uow = db.open_unit_of_work();
    uow.add_province(Province::new("Fujian"));

    // WHEN group-joining provinces with their donators
    let rows = uow
        .provinces()
        .group_join(
            uow.donators(),
            |p| p.id,
            |d| d.province_id,
            |p, donators| (p.name.clone(), donators.len()),
        )
        .collect()
        .unwrap();

    // THEN every province appears, the empty one with zero donators
    assert_eq!(rows.len(), 4);
    assert!(rows.contains(&("Shandong".to_string(), 2)));
    assert!(rows.contains(&("Fujian".to_string(), 0)));
}

#[test]
fn test_failed_persist_leaves_commit_retryable() {
    // GIVEN a store that will reject the next persist
    let mut store = seeded_store();
    store.fail_next_persist();
    let db = Database::new(store);
    let uow = db.open_unit_of_work();
    uow.add_province(Province::new("Fujian"));
    uow.remove_donator(DonatorId::new(5)).unwrap();

    // WHEN the first commit fails
    let failed = uow.commit();
    assert!(matches!(failed, Err(SessionError::Store(_))));

    // THEN staged changes survive and the retry applies them all
    assert_eq!(uow.provinces().count().unwrap(), 4);
    let summary = uow.commit().unwrap();
    assert_eq!(summary.provinces_added, 1);
    assert_eq!(summary.donators_removed, 1);
}

#[test]
fn test_tracked_state_machine_edges() {
    // GIVEN a loaded donator
    let db = database();
    let uow = db.open_unit_of_work();
    let alice = uow.find_donator(DonatorId::new(1)).unwrap().unwrap();

    // WHEN it is removed, updating it afterwards fails
    assert!(uow.remove_donator(DonatorId::new(1)).unwrap());
    let update = uow.update_donator(alice);
    assert!(matches!(
        update,
        Err(SessionError::Mutation(
            MutationError::InvalidStateTransition { .. }
        ))
    ));

    // AND removing it again is a no-op
    assert!(!uow.remove_donator(DonatorId::new(1)).unwrap());

    // AND updating a never-tracked donator is rejected
    let mut phantom = Donator::new("Nobody", Decimal::ZERO, date(2016, 1, 1));
    phantom.id = Some(DonatorId::new(99));
    assert!(matches!(
        uow.update_donator(phantom),
        Err(SessionError::Mutation(MutationError::NotAttached { .. }))
    ));
}

#[test]
fn test_queries_rematerialize_the_live_view() {
    // GIVEN a pipeline built before any mutation
    let db = database();
    let uow = db.open_unit_of_work();
    let all = uow.donators();
    assert_eq!(all.count().unwrap(), 5);

    // WHEN a removal is staged but not committed
    uow.remove_donator(DonatorId::new(1)).unwrap();

    // THEN the same pipeline reflects it on the next materialization
    assert_eq!(all.count().unwrap(), 4);
}

#[test]
fn test_find_then_update_round_trip() {
    // GIVEN a donator loaded through find
    let db = database();
    let uow = db.open_unit_of_work();
    let mut alice = uow.find_donator(DonatorId::new(1)).unwrap().unwrap();

    // WHEN its amount is updated and committed
    alice.amount = Decimal::from(75);
    uow.update_donator(alice).unwrap();
    let summary = uow.commit().unwrap();
    assert_eq!(summary.donators_modified, 1);

    // THEN a fresh unit of work sees the new value
    let fresh = db.open_unit_of_work();
    let reloaded = fresh.find_donator(DonatorId::new(1)).unwrap().unwrap();
    assert_eq!(reloaded.amount, Decimal::from(75));
}

#[test]
fn test_insert_province_with_donators_in_one_commit() {
    // GIVEN a staged province with two staged donators under it
    let db = database();
    let uow = db.open_unit_of_work();
    let fujian = uow.add_province(Province::new("Fujian"));
    uow.add_donator_to(
        Donator::new("Frank", Decimal::from(40), date(2016, 8, 1)),
        fujian,
    )
    .unwrap();
    uow.add_donator_to(
        Donator::new("Grace", Decimal::from(20), date(2016, 8, 2)),
        fujian,
    )
    .unwrap();

    // WHEN committed
    let summary = uow.commit().unwrap();
    assert_eq!(summary.provinces_added, 1);
    assert_eq!(summary.donators_added, 2);

    // THEN both donators reference the assigned province identity
    let fresh = db.open_unit_of_work();
    let fujian_id = fresh
        .provinces()
        .filter(|p| p.name == "Fujian")
        .first()
        .unwrap()
        .and_then(|p| p.id)
        .unwrap();
    let children = fresh.navigator().donators_of(fujian_id).unwrap();
    assert_eq!(children.len(), 2);
}

#[test]
fn test_add_under_removed_province_is_rejected() {
    // GIVEN a province staged for removal
    let db = database();
    let uow = db.open_unit_of_work();
    let shandong = ProvinceId::new(1);
    uow.remove_province(shandong).unwrap();

    // WHEN a donator is added under it
    let result = uow.add_donator_to(
        Donator::new("Frank", Decimal::from(40), date(2016, 8, 1)),
        TrackKey::Persisted(shandong),
    );

    // THEN the add is rejected
    assert!(matches!(
        result,
        Err(SessionError::Mutation(
            MutationError::InvalidStateTransition { .. }
        ))
    ));

    // AND after commit no donator references the removed province
    let summary = uow.commit().unwrap();
    assert_eq!(summary.donators_added, 0);
    let fresh = db.open_unit_of_work();
    assert_eq!(fresh.find_province(shandong).unwrap(), None);
    let orphans = fresh
        .donators()
        .filter(move |d| d.province_id == Some(shandong))
        .count()
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn test_staged_insert_amended_before_commit() {
    // GIVEN a staged donator
    let db = database();
    let uow = db.open_unit_of_work();
    let key = uow.add_donator(Donator::new("Frank", Decimal::from(40), date(2016, 8, 1)));

    // WHEN it is amended through its key and committed
    uow.update_donator_at(
        key,
        Donator::new("Frank", Decimal::from(45), date(2016, 8, 1)),
    )
    .unwrap();
    let summary = uow.commit().unwrap();

    // THEN one insert carries the amended values
    assert_eq!(summary.donators_added, 1);
    assert_eq!(summary.donators_modified, 0);
    let fresh = db.open_unit_of_work();
    let frank = fresh
        .donators()
        .filter(|d| d.name == "Frank")
        .first()
        .unwrap()
        .unwrap();
    assert_eq!(frank.amount, Decimal::from(45));
}

#[test]
fn test_discarded_unit_of_work_applies_nothing() {
    // GIVEN staged changes
    let db = database();
    let uow = db.open_unit_of_work();
    uow.remove_donator(DonatorId::new(1)).unwrap();

    // WHEN discarded
    uow.discard();

    // THEN the store is untouched
    let fresh = db.open_unit_of_work();
    assert_eq!(fresh.donators().count().unwrap(), 5);
}
