// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Environment facade: queued versus immediate routing.

use changeset_app_core::notify::NotificationLevel;
use changeset_core::{
    AddCharm, AddUnits, ChangeSetConfig, ChangeSetError, CommandOptions, Deploy, Environment,
    Submission,
};
use changeset_dry_tests::{HookCounter, ModelBuilder, RecordingTransport};
use changeset_model::ConfigMap;

fn environment() -> Environment<RecordingTransport> {
    let db = ModelBuilder::new()
        .ghost_application("$app1", "wordpress", "cs:trusty/wordpress-3")
        .application("mysql", "cs:trusty/mysql-1", ConfigMap::new())
        .machine("0", Some("trusty"))
        .unit("$app1/0", "$app1", None)
        .build();
    Environment::with_model(RecordingTransport::new(), ChangeSetConfig::default(), db)
}

async fn queue_deploy(env: &mut Environment<RecordingTransport>) {
    env.deploy(
        Deploy {
            charm_url: "cs:trusty/wordpress-3".into(),
            application_name: "wordpress".into(),
            ..Deploy::default()
        },
        CommandOptions::for_model("$app1"),
        None,
    )
    .await;
}

#[tokio::test]
async fn immediate_calls_skip_the_queue() {
    let mut env = environment();
    let hooks = HookCounter::new();
    let submission = env
        .add_charm(
            AddCharm {
                url: "cs:trusty/haproxy-2".into(),
                macaroon: None,
            },
            CommandOptions::immediate(),
            hooks.callback(),
        )
        .await;
    assert!(matches!(submission, Submission::Immediate(ref r) if r.is_ok()));
    assert_eq!(submission.key(), None);
    assert_eq!(env.transport().verbs(), vec!["add_charm"]);
    assert_eq!(hooks.callbacks(), 1);
    assert!(env.change_set().is_empty());
}

#[tokio::test]
async fn queued_calls_wait_for_commit() {
    let mut env = environment();
    let submission = env
        .expose("mysql", CommandOptions::default(), None)
        .await
        .unwrap();
    assert!(submission.key().is_some());
    assert!(env.transport().verbs().is_empty());
    assert!(env.db().application("mysql").unwrap().exposed);

    let summary = env.commit().await.unwrap();
    assert_eq!(summary.dispatched, 1);
    assert_eq!(env.transport().verbs(), vec!["expose"]);
}

#[tokio::test]
async fn immediate_config_on_a_queued_deploy_is_refused() {
    let mut env = environment();
    queue_deploy(&mut env).await;
    let err = env
        .set_config(
            "$app1",
            ConfigMap::new(),
            CommandOptions::immediate(),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err, ChangeSetError::QueuedApplication("$app1".into()));
    assert!(env.transport().verbs().is_empty());

    let queued = env
        .set_config("$app1", ConfigMap::new(), CommandOptions::default(), None)
        .await
        .unwrap();
    assert!(queued.key().is_some());
}

#[tokio::test]
async fn facade_places_commits_and_clears() {
    let mut env = environment();
    queue_deploy(&mut env).await;
    env.add_units(
        AddUnits {
            application: "$app1".into(),
            num_units: 1,
            to_machine: None,
        },
        CommandOptions::for_model("$app1/0"),
        None,
    )
    .await;
    env.place_unit("$app1/0", "0").unwrap();

    let summary = env.commit().await.unwrap();
    assert_eq!(summary.levels, 2);
    assert_eq!(env.transport().verbs(), vec!["deploy", "add_units"]);
    assert!(env.db().unit("wordpress/0").is_some());

    env.expose("mysql", CommandOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(env.clear(), 1);
    assert!(!env.db().application("mysql").unwrap().exposed);
    assert_eq!(env.change_set().current_index(), 2);
}

#[tokio::test]
async fn cancelling_requests_report_no_key() {
    let mut env = environment();
    env.expose("mysql", CommandOptions::default(), None)
        .await
        .unwrap();
    let submission = env
        .unexpose("mysql", CommandOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(submission, Submission::Queued(None));
    let (change_set, db) = env.parts_mut();
    assert!(change_set.is_empty());
    assert!(!db.application("mysql").unwrap().exposed);
}

#[test]
fn new_environments_use_configured_notifications() {
    let config = ChangeSetConfig {
        max_notifications: 1,
        ..ChangeSetConfig::default()
    };
    let mut env = Environment::new(RecordingTransport::new(), config);
    let db = env.db_mut();
    db.notifications
        .add(NotificationLevel::Info, "one", None::<String>);
    db.notifications
        .add(NotificationLevel::Info, "two", None::<String>);
    assert_eq!(db.notifications.len(), 1);
    assert_eq!(env.change_set().config().max_notifications, 1);
}
