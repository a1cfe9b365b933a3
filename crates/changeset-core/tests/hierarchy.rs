// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dependency levels and key generation.

use std::collections::BTreeMap;

use changeset_core::{
    AddCharm, AddUnits, Call, ChangeSet, Command, CommandOptions, HierarchyMode, Operation,
    RecordKey,
};
use changeset_dry_tests::ModelBuilder;
use changeset_model::ModelDb;
use proptest::prelude::*;
use proptest::sample::Index;
use rustc_hash::FxHashSet;

fn expose(app: &str) -> Command {
    Command::new(Call::new(Operation::Expose {
        application: app.to_owned(),
    }))
}

#[test]
fn diamond_graph_peels_into_four_levels() {
    let mut cs = ChangeSet::default();
    let db = ModelDb::new();
    let a = cs.create_record(expose("a"), [], None);
    let b = cs.create_record(expose("b"), [], None);
    let c = cs.create_record(expose("c"), [a.clone(), b.clone()], None);
    let d = cs.create_record(expose("d"), [a.clone()], None);
    let e = cs.create_record(expose("e"), [a.clone(), c.clone()], None);
    let f = cs.create_record(expose("f"), [e.clone()], None);

    let levels = cs.build_hierarchy(HierarchyMode::All, &db).unwrap();
    assert_eq!(levels, vec![vec![a, b], vec![c, d], vec![e], vec![f]]);
}

#[test]
fn placed_only_defers_unplaced_units() {
    let mut cs = ChangeSet::default();
    let db = ModelBuilder::new()
        .ghost_application("$app1", "wordpress", "cs:trusty/wordpress-3")
        .machine("0", Some("trusty"))
        .unit("$app1/0", "$app1", None)
        .unit("$app1/1", "$app1", Some("0"))
        .build();
    let unplaced = cs.create_record(
        Command::new(Call {
            operation: Operation::AddUnits(AddUnits {
                application: "wordpress".into(),
                num_units: 1,
                to_machine: None,
            }),
            options: CommandOptions::for_model("$app1/0"),
        }),
        [],
        None,
    );
    let placed = cs.create_record(
        Command::new(Call {
            operation: Operation::AddUnits(AddUnits {
                application: "wordpress".into(),
                num_units: 1,
                to_machine: Some("0".into()),
            }),
            options: CommandOptions::for_model("$app1/1"),
        }),
        [],
        None,
    );

    let levels = cs.build_hierarchy(HierarchyMode::PlacedOnly, &db).unwrap();
    assert_eq!(levels, vec![vec![placed.clone()]]);
    assert_eq!(cs.record(&unplaced).unwrap().index, 1);
    assert_eq!(cs.record(&placed).unwrap().index, 0);
}

#[test]
fn records_of_later_indexes_are_ignored() {
    let mut cs = ChangeSet::default();
    let db = ModelDb::new();
    let now = cs.create_record(expose("a"), [], None);
    let later = cs.create_record(expose("b"), [], None);
    cs.record_mut(&later).unwrap().index = 1;
    let levels = cs.build_hierarchy(HierarchyMode::All, &db).unwrap();
    assert_eq!(levels, vec![vec![now]]);
}

fn mixed(i: usize) -> Command {
    let operation = match i % 4 {
        0 => Operation::AddCharm(AddCharm {
            url: format!("cs:trusty/charm-{i}"),
            macaroon: None,
        }),
        1 => Operation::AddMachines { params: Vec::new() },
        2 => Operation::AddUnits(AddUnits {
            application: format!("app{i}"),
            num_units: 1,
            to_machine: None,
        }),
        _ => Operation::Expose {
            application: format!("app{i}"),
        },
    };
    Command::new(Call::new(operation))
}

#[test]
fn keys_stay_unique_across_thousands_of_records() {
    let mut cs = ChangeSet::default();
    let mut keys = FxHashSet::default();
    for i in 0..6000 {
        let key = cs.create_record(mixed(i), [], None);
        assert!(keys.insert(key.clone()), "duplicate key {key}");
        if i % 7 == 0 {
            assert!(cs.remove_record(&key).is_some());
        }
    }
    assert_eq!(keys.len(), 6000);
}

/// For each node, indices into the nodes created before it.
fn dag() -> impl Strategy<Value = Vec<Vec<Index>>> {
    prop::collection::vec(prop::collection::vec(any::<Index>(), 0..4), 1..24)
}

proptest! {
    #[test]
    fn keys_are_unique(count in 1usize..64) {
        let mut cs = ChangeSet::default();
        let keys: FxHashSet<RecordKey> = (0..count)
            .map(|i| cs.create_record(expose(&i.to_string()), [], None))
            .collect();
        prop_assert_eq!(keys.len(), count);
    }

    #[test]
    fn every_record_sits_one_level_above_its_deepest_parent(graph in dag()) {
        let mut cs = ChangeSet::default();
        let db = ModelDb::new();
        let mut keys: Vec<RecordKey> = Vec::new();
        let mut parents_of: BTreeMap<RecordKey, Vec<RecordKey>> = BTreeMap::new();
        for (i, picks) in graph.iter().enumerate() {
            let parents: Vec<RecordKey> = if i == 0 {
                Vec::new()
            } else {
                picks.iter().map(|p| keys[p.index(i)].clone()).collect()
            };
            let key = cs.create_record(expose(&i.to_string()), parents.clone(), None);
            parents_of.insert(key.clone(), parents);
            keys.push(key);
        }

        let levels = cs.build_hierarchy(HierarchyMode::All, &db).unwrap();
        let mut level_of: BTreeMap<RecordKey, usize> = BTreeMap::new();
        for (depth, level) in levels.iter().enumerate() {
            for key in level {
                prop_assert!(level_of.insert(key.clone(), depth).is_none());
            }
        }
        prop_assert_eq!(level_of.len(), keys.len());

        // Keys are created in order, so visiting them in order sees parents first.
        for key in &keys {
            let expected = parents_of[key]
                .iter()
                .map(|p| level_of[p] + 1)
                .max()
                .unwrap_or(0);
            prop_assert_eq!(level_of[key], expected);
        }
    }
}
