// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unit placement validation and record rewiring.

use changeset_app_core::notify::NotificationLevel;
use changeset_core::{
    validate_unit_placement, AddUnits, ChangeSet, CommandOptions, MachineParams, Operation,
    PlacementError, RecordKey,
};
use changeset_dry_tests::ModelBuilder;
use changeset_model::{ConfigMap, ModelDb};

fn model() -> ModelDb {
    ModelBuilder::new()
        .ghost_application("$app1", "wordpress", "cs:precise/wordpress-3")
        .application("mysql", "cs:trusty/mysql-1", ConfigMap::new())
        .machine("0", Some("trusty"))
        .machine("1", Some("precise"))
        .machine("new0", None)
        .unit("$app1/0", "$app1", None)
        .unit("mysql/0", "mysql", Some("new0"))
        .running_unit("mysql/1", "mysql", "0")
        .build()
}

fn queue_unit(cs: &mut ChangeSet) -> RecordKey {
    cs.lazy_add_units(
        AddUnits {
            application: "wordpress".into(),
            num_units: 1,
            to_machine: None,
        },
        CommandOptions::for_model("$app1/0"),
        None,
    )
}

fn to_machine(cs: &ChangeSet, key: &RecordKey) -> Option<String> {
    match cs.record(key).map(|r| r.operation()) {
        Some(Operation::AddUnits(args)) => args.to_machine.clone(),
        _ => None,
    }
}

#[test]
fn series_mismatch_is_rejected_with_a_notification() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    let key = queue_unit(&mut cs);

    let err = cs.place_unit("$app1/0", "0", &mut db).unwrap_err();
    assert_eq!(
        err,
        PlacementError::SeriesMismatch {
            unit_series: "precise".into(),
            machine_series: "trusty".into(),
            machine: "0".into(),
        }
    );
    let note = db.notifications.latest().unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.title, "Error placing unit");
    assert_eq!(
        note.message.as_deref(),
        Some("Error placing unit: unable to place a precise unit on the trusty machine 0")
    );
    assert!(db.unit("$app1/0").unwrap().machine.is_none());
    assert_eq!(to_machine(&cs, &key), None);
}

#[test]
fn seriesless_machines_refuse_mixed_series() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    queue_unit(&mut cs);
    let err = cs.place_unit("$app1/0", "new0", &mut db).unwrap_err();
    assert_eq!(
        err,
        PlacementError::MixedSeries {
            machine: "new0".into(),
            series: "trusty".into(),
        }
    );
    assert_eq!(db.notifications.len(), 1);
}

#[test]
fn validation_alone_does_not_touch_the_model() {
    let db = model();
    assert_eq!(validate_unit_placement("$app1/0", "1", &db), Ok(()));
    assert_eq!(
        validate_unit_placement("$app1/0", "9", &db),
        Err(PlacementError::UnknownMachine("9".into()))
    );
    assert_eq!(
        validate_unit_placement("ghost/7", "1", &db),
        Err(PlacementError::UnknownUnit("ghost/7".into()))
    );
    assert!(db.notifications.is_empty());
}

#[test]
fn units_must_be_queued_before_placement() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    let err = cs.place_unit("mysql/0", "0", &mut db).unwrap_err();
    assert_eq!(err, PlacementError::NotQueued("mysql/0".into()));
    assert_eq!(
        err.to_string(),
        "attempted to place a unit which has not been added: mysql/0"
    );
}

#[test]
fn placing_on_a_queued_machine_links_the_records() {
    let mut cs = ChangeSet::default();
    let mut db = ModelBuilder::new()
        .ghost_application("$app1", "wordpress", "cs:precise/wordpress-3")
        .machine("new1", None)
        .machine("1", Some("precise"))
        .unit("$app1/0", "$app1", None)
        .build();
    let unit = queue_unit(&mut cs);
    let machine = cs.lazy_add_machines(
        vec![MachineParams::default()],
        CommandOptions::for_model("new1"),
        None,
    );

    cs.place_unit("$app1/0", "new1", &mut db).unwrap();
    assert_eq!(cs.record(&unit).unwrap().parents, vec![machine.clone()]);
    assert_eq!(to_machine(&cs, &unit), None);
    match cs.record(&machine).map(|r| r.operation()) {
        Some(Operation::AddMachines { params }) => {
            assert_eq!(params[0].series.as_deref(), Some("precise"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(db.unit("$app1/0").unwrap().machine.as_deref(), Some("new1"));

    // Moving to a real machine drops the queued-machine link.
    cs.place_unit("$app1/0", "1", &mut db).unwrap();
    assert!(cs.record(&unit).unwrap().parents.is_empty());
    assert_eq!(to_machine(&cs, &unit).as_deref(), Some("1"));
}

#[test]
fn unplacing_resets_ghosts_and_deletes_running_units() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    let key = queue_unit(&mut cs);
    cs.place_unit("$app1/0", "1", &mut db).unwrap();

    assert!(cs.unplace_unit("$app1/0", &mut db));
    assert!(db.unit("$app1/0").unwrap().machine.is_none());
    assert_eq!(to_machine(&cs, &key), None);

    assert!(!cs.unplace_unit("mysql/1", &mut db));
    let running = db.unit("mysql/1").unwrap();
    assert!(running.deleted);
    assert_eq!(running.machine.as_deref(), Some("0"));
}

#[test]
fn unplace_service_units_reports_what_moved() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    let moved = cs.unplace_service_units("mysql", &mut db);
    assert_eq!(moved, vec!["mysql/0".to_owned(), "mysql/1".to_owned()]);
    assert!(db.unit("mysql/0").unwrap().machine.is_none());
}
