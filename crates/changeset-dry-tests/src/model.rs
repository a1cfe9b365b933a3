// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fluent construction of model fixtures.

use changeset_model::{Application, ConfigMap, Endpoint, Machine, ModelDb, Relation, Unit};

/// Builder for a [`ModelDb`] populated with ghost and real entities.
///
/// # Example
///
/// ```
/// use changeset_dry_tests::ModelBuilder;
///
/// let db = ModelBuilder::new()
///     .ghost_application("$app1", "wordpress", "cs:trusty/wordpress-3")
///     .machine("0", Some("trusty"))
///     .unit("$app1/0", "$app1", Some("0"))
///     .build();
/// assert_eq!(db.unit("$app1/0").unwrap().machine.as_deref(), Some("0"));
/// ```
#[derive(Debug, Default)]
pub struct ModelBuilder {
    db: ModelDb,
}

impl ModelBuilder {
    /// Start from an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ghost application.
    pub fn ghost_application(mut self, id: &str, name: &str, charm_url: &str) -> Self {
        self.db
            .insert_application(Application::ghost(id, name, charm_url));
        self
    }

    /// Add a deployed application whose environment config is `config`.
    pub fn application(mut self, name: &str, charm_url: &str, config: ConfigMap) -> Self {
        let mut app = Application::ghost(name, name, charm_url);
        app.config.clone_from(&config);
        app.environment_config = config;
        self.db.insert_application(app);
        self
    }

    /// Add a machine, optionally with a series.
    pub fn machine(mut self, id: &str, series: Option<&str>) -> Self {
        let mut machine = Machine::new(id);
        machine.series = series.map(str::to_owned);
        self.db.insert_machine(machine);
        self
    }

    /// Add a container hosted on `parent`.
    pub fn container(mut self, id: &str, parent: &str) -> Self {
        self.db.insert_machine(Machine::new(id).inside(parent));
        self
    }

    /// Add an uncommitted unit, placed when `machine` is given.
    pub fn unit(mut self, id: &str, application: &str, machine: Option<&str>) -> Self {
        let mut unit = Unit::new(id, application);
        unit.machine = machine.map(str::to_owned);
        self.db.insert_unit(unit);
        self
    }

    /// Add a unit already running on the backend.
    pub fn running_unit(mut self, id: &str, application: &str, machine: &str) -> Self {
        let mut unit = Unit::new(id, application).on(machine);
        unit.agent_state = Some("started".to_owned());
        self.db.insert_unit(unit);
        self
    }

    /// Add a relation between `(application, endpoint)` pairs.
    pub fn relation(mut self, id: &str, a: (&str, &str), b: (&str, &str)) -> Self {
        self.db.insert_relation(Relation::new(
            id,
            [Endpoint::new(a.0, a.1), Endpoint::new(b.0, b.1)],
        ));
        self
    }

    /// Finish.
    pub fn build(self) -> ModelDb {
        self.db
    }
}
