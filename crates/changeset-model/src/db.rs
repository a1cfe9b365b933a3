// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory live model store.

use std::collections::BTreeMap;

use changeset_app_core::notify::NotificationService;
use tracing::debug;

use crate::entity::{Application, Machine, Relation, Unit};
use crate::series::{series_from_charm_url, unit_number};

/// The live model: applications, units, machines and relations keyed by id.
///
/// Collections are `BTreeMap`s so iteration (e.g. "units on machine 0") is
/// ordered by identifier regardless of insertion history.
#[derive(Debug, Default)]
pub struct ModelDb {
    applications: BTreeMap<String, Application>,
    units: BTreeMap<String, Unit>,
    machines: BTreeMap<String, Machine>,
    relations: BTreeMap<String, Relation>,
    /// User-facing notifications raised while mutating the model.
    pub notifications: NotificationService,
}

impl ModelDb {
    /// Empty model with a default notification queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty model using the supplied notification queue.
    pub fn with_notifications(notifications: NotificationService) -> Self {
        Self {
            notifications,
            ..Self::default()
        }
    }

    // Applications ---------------------------------------------------------

    /// Insert or replace an application.
    pub fn insert_application(&mut self, application: Application) {
        self.applications
            .insert(application.id.clone(), application);
    }

    /// Application by id.
    pub fn application(&self, id: &str) -> Option<&Application> {
        self.applications.get(id)
    }

    /// Mutable application by id.
    pub fn application_mut(&mut self, id: &str) -> Option<&mut Application> {
        self.applications.get_mut(id)
    }

    /// Application by display name.
    pub fn application_by_name(&self, name: &str) -> Option<&Application> {
        self.applications.values().find(|a| a.name == name)
    }

    /// Remove an application (units and relations are left alone).
    pub fn remove_application(&mut self, id: &str) -> Option<Application> {
        debug!(application = id, "removing application from model");
        self.applications.remove(id)
    }

    /// All applications, ordered by id.
    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    // Units ----------------------------------------------------------------

    /// Insert or replace a unit.
    pub fn insert_unit(&mut self, unit: Unit) {
        self.units.insert(unit.id.clone(), unit);
    }

    /// Unit by id.
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Mutable unit by id.
    pub fn unit_mut(&mut self, id: &str) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    /// Remove a unit.
    pub fn remove_unit(&mut self, id: &str) -> Option<Unit> {
        debug!(unit = id, "removing unit from model");
        self.units.remove(id)
    }

    /// Units belonging to `application`.
    pub fn units_of_application<'a>(
        &'a self,
        application: &'a str,
    ) -> impl Iterator<Item = &'a Unit> + 'a {
        self.units
            .values()
            .filter(move |u| u.application == application)
    }

    /// Units placed on `machine`. With `include_containers`, units on any
    /// container nested under the machine are included too.
    pub fn units_on_machine(&self, machine: &str, include_containers: bool) -> Vec<&Unit> {
        let nested = if include_containers {
            self.descendants(machine)
        } else {
            Vec::new()
        };
        self.units
            .values()
            .filter(|u| {
                u.machine.as_deref().is_some_and(|m| {
                    m == machine || nested.iter().any(|d| d.as_str() == m)
                })
            })
            .collect()
    }

    /// Units without a machine.
    pub fn unplaced_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|u| u.machine.is_none())
    }

    /// Re-key a unit so its id matches a renamed application
    /// (`$app1/0` becomes `wordpress/0`). Returns the new id, or `None` when
    /// the unit is unknown.
    pub fn update_unit_id(&mut self, application_name: &str, unit_id: &str) -> Option<String> {
        let mut unit = self.units.remove(unit_id)?;
        let number = unit_number(unit_id).unwrap_or("0");
        unit.id = format!("{application_name}/{number}");
        let new_id = unit.id.clone();
        debug!(from = unit_id, to = %new_id, "re-keyed unit");
        self.units.insert(new_id.clone(), unit);
        Some(new_id)
    }

    /// Series a unit will run: the application's explicit series, otherwise
    /// the series embedded in its charm URL.
    pub fn unit_series(&self, unit: &Unit) -> Option<String> {
        let application = self.applications.get(&unit.application)?;
        application.series.clone().or_else(|| {
            series_from_charm_url(&application.charm_url).map(str::to_owned)
        })
    }

    // Machines -------------------------------------------------------------

    /// Insert or replace a machine.
    pub fn insert_machine(&mut self, machine: Machine) {
        self.machines.insert(machine.id.clone(), machine);
    }

    /// Machine by id.
    pub fn machine(&self, id: &str) -> Option<&Machine> {
        self.machines.get(id)
    }

    /// Mutable machine by id.
    pub fn machine_mut(&mut self, id: &str) -> Option<&mut Machine> {
        self.machines.get_mut(id)
    }

    /// Remove a machine.
    pub fn remove_machine(&mut self, id: &str) -> Option<Machine> {
        debug!(machine = id, "removing machine from model");
        self.machines.remove(id)
    }

    /// Ids of every container nested (at any depth) under `machine`.
    pub fn descendants(&self, machine: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let mut frontier = vec![machine.to_owned()];
        while let Some(parent) = frontier.pop() {
            for m in self.machines.values() {
                if m.parent_id.as_deref() == Some(parent.as_str()) && !found.contains(&m.id) {
                    found.push(m.id.clone());
                    frontier.push(m.id.clone());
                }
            }
        }
        found
    }

    // Relations ------------------------------------------------------------

    /// Insert or replace a relation.
    pub fn insert_relation(&mut self, relation: Relation) {
        self.relations.insert(relation.id.clone(), relation);
    }

    /// Relation by id.
    pub fn relation(&self, id: &str) -> Option<&Relation> {
        self.relations.get(id)
    }

    /// Remove a relation.
    pub fn remove_relation(&mut self, id: &str) -> Option<Relation> {
        debug!(relation = id, "removing relation from model");
        self.relations.remove(id)
    }

    /// Relation joining the two endpoints, in either order.
    pub fn relation_from_endpoints_mut(
        &mut self,
        endpoints: &[crate::Endpoint; 2],
    ) -> Option<&mut Relation> {
        self.relations.values_mut().find(|r| r.joins(endpoints))
    }

    /// Ids of relations touching `application`.
    pub fn relations_of_application(&self, application: &str) -> Vec<String> {
        self.relations
            .values()
            .filter(|r| r.involves(application))
            .map(|r| r.id.clone())
            .collect()
    }
}
