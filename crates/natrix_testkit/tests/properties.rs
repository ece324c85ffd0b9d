//! Property tests: generated store contents driven through the adapter.

use natrix_core::{Iterable, NativeIter};
use natrix_ffi::{nx_object_id, NxConflictIterator, NxEntryIterator, NxOid};
use natrix_testkit::{
    conflicts_strategy, consumed_strategy, entries_strategy, objects_strategy, PropTestConfig,
    TestStore,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::ffi::{c_char, CStr};

fn text(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn every_object_is_produced_once_and_released(objects in objects_strategy(24)) {
        let mut store = TestStore::new();
        let expected: BTreeSet<NxOid> = objects
            .iter()
            .map(|(kind, data)| store.put(*kind, data))
            .collect();

        let produced: Vec<NxOid> = store
            .objects()
            .into_iter()
            .map(|o| unsafe { *o.unwrap().call_direct(|p| nx_object_id(p)) })
            .collect();

        prop_assert_eq!(produced, expected.iter().copied().collect::<Vec<_>>());
        let stats = store.stats();
        prop_assert_eq!(stats.objects_created, expected.len() as u64);
        prop_assert_eq!(stats.live_objects(), 0);
        prop_assert_eq!(stats.live_iterators(), 0);
    }

    #[test]
    fn abandoning_after_any_prefix_releases_everything(
        (objects, taken) in objects_strategy(16).prop_flat_map(|objects| {
            let len = objects.len();
            (Just(objects), consumed_strategy(len))
        })
    ) {
        let mut store = TestStore::new();
        for (kind, data) in &objects {
            store.put(*kind, data);
        }

        let held: Vec<_> = store.objects().into_iter().take(taken).collect();
        prop_assert!(held.len() <= taken);
        prop_assert_eq!(store.stats().live_iterators(), 0);

        drop(held);
        prop_assert_eq!(store.stats().live_objects(), 0);
    }

    #[test]
    fn entries_come_back_in_name_order(entries in entries_strategy(12)) {
        let mut store = TestStore::new();
        for (name, value) in &entries {
            store.set_entry(name, value);
        }

        let mut it = NativeIter::new(store.entries(), NxEntryIterator::protocol());
        let mut seen = Vec::new();
        while let Some(entry) = it.next_item() {
            let entry = entry.unwrap();
            seen.push((text(entry.name), text(entry.value)));
        }

        prop_assert_eq!(it.produced(), entries.len());
        prop_assert_eq!(seen, entries);
        // Lent entries are not owned copies.
        prop_assert_eq!(store.stats().entries_created, 0);
    }

    #[test]
    fn conflict_views_match_recorded_sides(conflicts in conflicts_strategy(8)) {
        let mut store = TestStore::new();
        for c in &conflicts {
            store.add_conflict(&c.path, c.ancestor.as_deref(), &c.ours, &c.theirs);
        }

        let mut it = NativeIter::new(store.conflicts(), NxConflictIterator::protocol());
        for c in &conflicts {
            let views = it.next_item().unwrap().unwrap();
            prop_assert_eq!(views.get(0).map(|e| text(e.value)), c.ancestor.clone());
            prop_assert_eq!(text(views.get(1).unwrap().value), c.ours.clone());
            prop_assert_eq!(text(views.get(2).unwrap().value), c.theirs.clone());
            prop_assert_eq!(text(views.get(2).unwrap().name), c.path.clone());
        }
        prop_assert!(it.next_item().is_none());
    }
}
