// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Commit executor: level ordering, concurrency, result propagation.

use changeset_core::{
    AddCharm, AddUnits, Call, ChangeSet, ChangeSetConfig, ChangeSetError, ChangeSetEvent, Command,
    CommandOptions, Deploy, MachineParams, OpResult, Operation, ResultDetail,
};
use changeset_dry_tests::{HookCounter, ModelBuilder, RecordingTransport};
use changeset_model::{CommitStatus, ConfigMap, Endpoint, ModelDb};

const WORDPRESS: &str = "cs:trusty/wordpress-3";

fn model() -> ModelDb {
    ModelBuilder::new()
        .ghost_application("$app1", "wordpress", WORDPRESS)
        .application("mysql", "cs:trusty/mysql-1", ConfigMap::new())
        .machine("new0", None)
        .machine("0", Some("trusty"))
        .unit("$app1/0", "$app1", None)
        .build()
}

/// Queue the canonical scenario: charm, deploy, ghost machine, unit placed on
/// it, config, expose and a relation to an existing application.
fn queue_scenario(cs: &mut ChangeSet, db: &mut ModelDb, hooks: &HookCounter) {
    cs.lazy_add_charm(
        AddCharm {
            url: WORDPRESS.into(),
            macaroon: None,
        },
        CommandOptions::default(),
        hooks.callback(),
    );
    cs.lazy_deploy(
        Deploy {
            charm_url: WORDPRESS.into(),
            application_name: "wordpress".into(),
            ..Deploy::default()
        },
        CommandOptions::for_model("$app1"),
        hooks.callback(),
    );
    cs.lazy_add_machines(
        vec![MachineParams::default()],
        CommandOptions::for_model("new0"),
        hooks.callback(),
    );
    cs.lazy_add_units(
        AddUnits {
            application: "$app1".into(),
            num_units: 1,
            to_machine: None,
        },
        CommandOptions::for_model("$app1/0"),
        hooks.callback(),
    );
    cs.place_unit("$app1/0", "new0", db).unwrap();
    let mut config = ConfigMap::new();
    config.insert("blog-title".into(), serde_json::json!("hello"));
    cs.lazy_set_config("$app1", config, CommandOptions::default(), hooks.callback(), db)
        .unwrap();
    cs.lazy_expose("$app1", CommandOptions::default(), hooks.callback(), db)
        .unwrap();
    cs.lazy_add_relation(
        [Endpoint::new("$app1", "db"), Endpoint::new("mysql", "db")],
        CommandOptions::for_model("rel-ghost"),
        hooks.callback(),
    );
}

fn sorted(mut verbs: Vec<&'static str>) -> Vec<&'static str> {
    verbs.sort_unstable();
    verbs
}

#[tokio::test]
async fn levels_run_in_order_with_real_ids_patched_in() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    let hooks = HookCounter::new();
    queue_scenario(&mut cs, &mut db, &hooks);
    db.application_mut("$app1").unwrap().name = "blog".into();

    let transport = RecordingTransport::new();
    let summary = cs.commit(&transport, &mut db).await.unwrap();

    assert_eq!(summary.levels, 3);
    assert_eq!(summary.dispatched, 7);
    assert_eq!(summary.failed, 0);
    let verbs = transport.verbs();
    assert_eq!(sorted(verbs[..2].to_vec()), vec!["add_charm", "add_machines"]);
    assert_eq!(verbs[2], "deploy");
    assert_eq!(
        sorted(verbs[3..].to_vec()),
        vec!["add_relation", "add_units", "expose", "set_config"]
    );
    assert!(transport.max_in_flight() >= 2);

    for op in transport.operations() {
        match op {
            Operation::Deploy(d) => assert_eq!(d.application_name, "blog"),
            Operation::AddMachines { params } => {
                assert_eq!(params[0].series.as_deref(), Some("trusty"));
            }
            Operation::AddUnits(u) => {
                assert_eq!(u.application, "blog");
                assert_eq!(u.to_machine.as_deref(), Some("0"));
            }
            Operation::SetConfig { application, .. } | Operation::Expose { application } => {
                assert_eq!(application, "blog");
            }
            Operation::AddRelation { endpoints } => {
                assert_eq!(endpoints[0].application, "blog");
                assert_eq!(endpoints[1].application, "mysql");
            }
            _ => {}
        }
    }

    assert!(db.unit("blog/0").is_some());
    assert!(db.unit("$app1/0").is_none());
    assert_eq!(
        db.machine("new0").unwrap().commit_status,
        CommitStatus::Committed
    );
    assert_eq!(hooks.callbacks(), 7);
    assert!(cs.is_empty());
    assert_eq!(cs.current_index(), 1);
}

#[tokio::test]
async fn failures_are_counted_and_still_propagate() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    let hooks = HookCounter::new();
    queue_scenario(&mut cs, &mut db, &hooks);

    let transport = RecordingTransport::new();
    transport.respond("deploy", OpResult::failed("charm store unavailable"));
    let summary = cs.commit(&transport, &mut db).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.dispatched, 7);
    assert_eq!(hooks.callbacks(), 7);
    let failed: Vec<_> = hooks
        .results()
        .into_iter()
        .filter_map(|r| r.err)
        .collect();
    assert_eq!(failed, vec!["charm store unavailable".to_owned()]);
    assert!(cs.is_empty());
}

#[tokio::test]
async fn unplaced_units_wait_for_the_next_commit() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    cs.lazy_deploy(
        Deploy {
            charm_url: WORDPRESS.into(),
            application_name: "wordpress".into(),
            ..Deploy::default()
        },
        CommandOptions::for_model("$app1"),
        None,
    );
    cs.lazy_add_units(
        AddUnits {
            application: "$app1".into(),
            num_units: 1,
            to_machine: None,
        },
        CommandOptions::for_model("$app1/0"),
        None,
    );

    let transport = RecordingTransport::new();
    let first = cs.commit(&transport, &mut db).await.unwrap();
    assert_eq!(first.deferred, 1);
    assert_eq!(transport.verbs(), vec!["deploy"]);
    assert_eq!(cs.current_change_set().len(), 1);

    // The deploy result re-keyed the ghost unit.
    cs.place_unit("wordpress/0", "0", &mut db).unwrap();
    let second = cs.commit(&transport, &mut db).await.unwrap();
    assert_eq!(second.index, 1);
    assert_eq!(transport.verbs(), vec!["deploy", "add_units"]);
    match transport.operations().last() {
        Some(Operation::AddUnits(u)) => assert_eq!(u.to_machine.as_deref(), Some("0")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(cs.is_empty());
}

#[tokio::test]
async fn unplaced_units_commit_when_deferral_is_off() {
    let config = ChangeSetConfig {
        defer_unplaced_units: false,
        ..ChangeSetConfig::default()
    };
    let mut cs = ChangeSet::new(config);
    let mut db = model();
    cs.lazy_add_units(
        AddUnits {
            application: "mysql".into(),
            num_units: 1,
            to_machine: None,
        },
        CommandOptions::for_model("$app1/0"),
        None,
    );
    let transport = RecordingTransport::new();
    let summary = cs.commit(&transport, &mut db).await.unwrap();
    assert_eq!(summary.deferred, 0);
    assert_eq!(transport.verbs(), vec!["add_units"]);
}

#[tokio::test]
async fn events_follow_the_record_lifecycle() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    let key = cs.create_record(
        Command::new(Call::new(Operation::Expose {
            application: "mysql".into(),
        })),
        [],
        None,
    );
    let mut rx = cs.subscribe();
    cs.commit(&RecordingTransport::new(), &mut db).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], ChangeSetEvent::Commit { record } if record.id == key));
    assert!(matches!(&events[1], ChangeSetEvent::TaskComplete { record, .. } if record.executed));
    assert_eq!(events[2], ChangeSetEvent::ChangeSetModified);
    assert_eq!(events[3], ChangeSetEvent::CurrentCommitFinished { index: 0 });
}

#[tokio::test]
async fn empty_index_still_advances() {
    let mut cs = ChangeSet::default();
    let mut db = ModelDb::new();
    let summary = cs.commit(&RecordingTransport::new(), &mut db).await.unwrap();
    assert_eq!(summary.levels, 0);
    assert_eq!(cs.current_index(), 1);
}

#[tokio::test]
async fn prepare_and_parent_hooks_fire_once_per_event() {
    let mut cs = ChangeSet::default();
    let mut db = ModelDb::new();
    let hooks = HookCounter::new();
    let parent = cs.create_record(
        Command::new(Call::new(Operation::Expose {
            application: "a".into(),
        }))
        .with_prepare(hooks.prepare()),
        [],
        None,
    );
    cs.create_record(
        Command::new(Call::new(Operation::Expose {
            application: "b".into(),
        }))
        .with_prepare(hooks.prepare())
        .with_parent_results(hooks.parent_results()),
        [parent.clone()],
        None,
    );
    cs.commit(&RecordingTransport::new(), &mut db).await.unwrap();
    assert_eq!(hooks.prepares(), 2);
    assert_eq!(hooks.parents_seen(), vec![parent]);
}

#[test]
fn completion_only_reaches_children_of_the_finished_record() {
    let mut cs = ChangeSet::default();
    let mut db = ModelDb::new();
    let expose = |app: &str| {
        Command::new(Call::new(Operation::Expose {
            application: app.to_owned(),
        }))
    };
    let related = HookCounter::new();
    let unrelated = HookCounter::new();
    let parent = cs.create_record(expose("a"), [], None);
    let other = cs.create_record(expose("b"), [], None);
    let child = cs.create_record(
        expose("c").with_parent_results(related.parent_results()),
        [parent.clone()],
        None,
    );
    let stranger = cs.create_record(
        expose("d").with_parent_results(unrelated.parent_results()),
        [other.clone()],
        None,
    );

    let result = OpResult::ok(ResultDetail::Application {
        application_name: "a".into(),
    });
    assert!(cs.complete(&parent, result.clone(), &mut db));

    assert_eq!(related.parent_outcomes(), vec![(parent, result)]);
    assert!(unrelated.parent_outcomes().is_empty());
    assert!(cs.record(&child).is_some());
    assert!(cs.record(&stranger).is_some());
    assert!(cs.record(&other).is_some());
}

#[tokio::test]
async fn units_adopt_the_name_the_deploy_reported() {
    let mut cs = ChangeSet::default();
    let mut db = ModelBuilder::new()
        .ghost_application("$app1", "wordpress", WORDPRESS)
        .machine("0", Some("trusty"))
        .unit("$app1/0", "$app1", Some("0"))
        .build();
    cs.lazy_deploy(
        Deploy {
            charm_url: WORDPRESS.into(),
            application_name: "wordpress".into(),
            ..Deploy::default()
        },
        CommandOptions::for_model("$app1"),
        None,
    );
    cs.lazy_add_units(
        AddUnits {
            application: "$app1".into(),
            num_units: 1,
            to_machine: Some("0".into()),
        },
        CommandOptions::for_model("$app1/0"),
        None,
    );

    let transport = RecordingTransport::new();
    transport.respond(
        "deploy",
        OpResult::ok(ResultDetail::Deployed {
            application_name: "wordpress-2".into(),
            charm_url: WORDPRESS.into(),
        }),
    );
    cs.commit(&transport, &mut db).await.unwrap();

    assert_eq!(transport.verbs(), vec!["deploy", "add_units"]);
    let added: Vec<String> = transport
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            Operation::AddUnits(args) => Some(args.application),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["wordpress-2"]);
    assert!(db.unit("wordpress-2/0").is_some());
    assert!(db.unit("wordpress/0").is_none());
    assert!(db.unit("$app1/0").is_none());
}

#[tokio::test]
async fn deploy_targets_the_machine_its_queued_parent_created() {
    let mut cs = ChangeSet::default();
    let mut db = model();
    cs.lazy_add_machines(
        vec![MachineParams::default()],
        CommandOptions::for_model("new0"),
        None,
    );
    cs.lazy_deploy(
        Deploy {
            charm_url: WORDPRESS.into(),
            application_name: "wordpress".into(),
            to_machine: Some("new0".into()),
            ..Deploy::default()
        },
        CommandOptions::for_model("$app1"),
        None,
    );

    let transport = RecordingTransport::new();
    let summary = cs.commit(&transport, &mut db).await.unwrap();

    assert_eq!(summary.levels, 2);
    assert_eq!(transport.verbs(), vec!["add_machines", "deploy"]);
    let targets: Vec<Option<String>> = transport
        .operations()
        .into_iter()
        .filter_map(|op| match op {
            Operation::Deploy(args) => Some(args.to_machine),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec![Some("0".to_owned())]);
}

#[tokio::test]
async fn cycles_abort_before_dispatch() {
    let mut cs = ChangeSet::default();
    let mut db = ModelDb::new();
    let a = cs.create_record(
        Command::new(Call::new(Operation::Expose {
            application: "a".into(),
        })),
        [],
        None,
    );
    let b = cs.create_record(
        Command::new(Call::new(Operation::Expose {
            application: "b".into(),
        })),
        [a.clone()],
        None,
    );
    cs.record_mut(&a).unwrap().parents.push(b.clone());

    let transport = RecordingTransport::new();
    let err = cs.commit(&transport, &mut db).await.unwrap_err();
    assert_eq!(err, ChangeSetError::DependencyCycle(vec![a, b]));
    assert!(transport.verbs().is_empty());
    assert_eq!(cs.current_index(), 0);
}
