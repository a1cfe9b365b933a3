// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Change-set CLI
//!
//! Runs a queued deployment against the in-process sandbox backend and
//! inspects the persisted engine settings.

use std::io::{self, Write};

use anyhow::{Context, Result};
use changeset_app_core::config::ConfigService;
use changeset_config_fs::FsConfigStore;
use changeset_core::{
    AddCharm, AddUnits, ChangeSetConfig, CommandOptions, Deploy, Environment, MachineParams,
    Record, SandboxTransport, CONFIG_KEY,
};
use changeset_model::{Application, ConfigMap, Endpoint, Machine, ModelDb, Unit};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CHARM: &str = "cs:trusty/wordpress-3";

#[derive(Parser, Debug)]
#[command(author, version, about = "Environment change-set tools")]
struct Args {
    /// Command to execute
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Queue a deployment against the sandbox backend, commit it and print
    /// the outcome as JSON
    Demo {
        /// Make the sandbox reject the deploy call
        #[arg(long)]
        fail_deploy: bool,
        /// Rename the ghost application before committing
        #[arg(long)]
        rename: Option<String>,
    },
    /// Print the effective engine settings as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(io::stderr)
        .init();

    match args.cmd {
        Some(Command::Demo {
            fail_deploy,
            rename,
        }) => demo(fail_deploy, rename).await,
        Some(Command::Config) => {
            let config = load_config()?;
            emit(&serde_json::to_value(config)?)
        }
        None => emit(&json!({ "usage": "changeset <demo|config>; see --help" })),
    }
}

fn load_config() -> Result<ChangeSetConfig> {
    let store = FsConfigStore::new().context("locate config directory")?;
    info!(dir = %store.base().display(), "loading settings");
    ConfigService::new(store)
        .load_or_default(CONFIG_KEY)
        .context("load change-set settings")
}

fn emit(value: &serde_json::Value) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Ghost wordpress with one unplaced unit and a ghost machine, next to a
/// running mysql.
fn seed_model(config: &ChangeSetConfig) -> ModelDb {
    let mut db = ModelDb::with_notifications(config.notification_service());
    db.insert_application(Application::ghost("$app1", "wordpress", CHARM));
    let mut mysql = Application::ghost("mysql", "mysql", "cs:trusty/mysql-1");
    mysql.exposed = true;
    db.insert_application(mysql);
    db.insert_machine(Machine::new("new0"));
    db.insert_unit(Unit::new("$app1/0", "$app1"));
    db
}

async fn demo(fail_deploy: bool, rename: Option<String>) -> Result<()> {
    let config = load_config().unwrap_or_else(|err| {
        warn!(error = %err, "using default settings");
        ChangeSetConfig::default()
    });
    let db = seed_model(&config);
    let mut env = Environment::with_model(SandboxTransport::new(), config, db);
    if fail_deploy {
        env.transport().fail_verb("deploy");
    }
    let mut events = env.change_set().subscribe();

    env.add_charm(
        AddCharm {
            url: CHARM.into(),
            macaroon: None,
        },
        CommandOptions::default(),
        None,
    )
    .await;
    env.deploy(
        Deploy {
            charm_url: CHARM.into(),
            application_name: "wordpress".into(),
            ..Deploy::default()
        },
        CommandOptions::for_model("$app1"),
        None,
    )
    .await;
    env.add_machines(
        vec![MachineParams::default()],
        CommandOptions::for_model("new0"),
        None,
    )
    .await;
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
    env.place_unit("$app1/0", "new0")?;

    let mut settings = ConfigMap::new();
    settings.insert("blog-title".into(), json!("change sets"));
    env.set_config("$app1", settings, CommandOptions::default(), None)
        .await?;
    env.expose("$app1", CommandOptions::default(), None).await?;
    env.add_relation(
        [Endpoint::new("$app1", "db"), Endpoint::new("mysql", "db")],
        CommandOptions::default(),
        None,
    )
    .await;

    if let Some(name) = rename {
        if let Some(app) = env.db_mut().application_mut("$app1") {
            info!(name = %name, "renaming ghost application");
            app.name = name;
        }
    }

    let queued = env.change_set().len();
    let summary = env.commit().await?;
    while let Ok(event) = events.try_recv() {
        info!(?event, "change-set event");
    }

    let remaining: Vec<_> = env.change_set().records().map(Record::summary).collect();
    let units: Vec<&str> = env
        .db()
        .units_of_application("$app1")
        .map(|u| u.id.as_str())
        .collect();
    emit(&json!({
        "queued": queued,
        "summary": summary,
        "backend_calls": env.transport().calls(),
        "units": units,
        "remaining": remaining,
        "notifications": env.db().notifications.len(),
    }))
}
