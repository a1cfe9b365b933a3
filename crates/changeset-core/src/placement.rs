// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Unit placement: validation, placing and unplacing queued units.

use changeset_app_core::notify::NotificationLevel;
use changeset_model::ModelDb;
use tracing::{debug, warn};

use crate::change_set::ChangeSet;
use crate::error::PlacementError;
use crate::key::RecordFamily;
use crate::operation::Operation;

/// Check that `unit` may live on `machine`.
///
/// A machine with an explicit series only takes units of that series. A
/// machine without one (a ghost) only takes units matching the series of the
/// units it already hosts.
pub fn validate_unit_placement(
    unit: &str,
    machine: &str,
    db: &ModelDb,
) -> Result<(), PlacementError> {
    let target = db
        .machine(machine)
        .ok_or_else(|| PlacementError::UnknownMachine(machine.to_owned()))?;
    let placed = db
        .unit(unit)
        .ok_or_else(|| PlacementError::UnknownUnit(unit.to_owned()))?;
    let unit_series = db.unit_series(placed);

    if let Some(machine_series) = &target.series {
        if unit_series.as_ref() != Some(machine_series) {
            return Err(PlacementError::SeriesMismatch {
                unit_series: unit_series.unwrap_or_default(),
                machine_series: machine_series.clone(),
                machine: target.id.clone(),
            });
        }
        return Ok(());
    }

    for existing in db.units_on_machine(machine, false) {
        let existing_series = db.unit_series(existing);
        if existing_series != unit_series {
            return Err(PlacementError::MixedSeries {
                machine: target.id.clone(),
                series: existing_series.unwrap_or_default(),
            });
        }
    }
    Ok(())
}

impl ChangeSet {
    /// Place a queued unit on a machine or container.
    ///
    /// On a validation failure an error notification is pushed onto the
    /// model and nothing else changes.
    pub fn place_unit(
        &mut self,
        unit: &str,
        machine: &str,
        db: &mut ModelDb,
    ) -> Result<(), PlacementError> {
        let unit_key = self
            .queued_unit(unit)
            .ok_or_else(|| PlacementError::NotQueued(unit.to_owned()))?;
        if let Err(err) = validate_unit_placement(unit, machine, db) {
            warn!(unit, machine, error = %err, "rejected unit placement");
            db.notifications.add(
                NotificationLevel::Error,
                "Error placing unit",
                format!("Error placing unit: {err}"),
            );
            return Err(err);
        }

        let unit_series = db.unit(unit).and_then(|u| db.unit_series(u));
        let machine_key = self.queued_machine(machine);
        if let Some(machine_key) = &machine_key {
            if let Some(record) = self.record_mut(machine_key) {
                if let Operation::AddMachines { params } = &mut record.command.call.operation {
                    if let Some(first) = params.first_mut() {
                        if first.series.is_none() {
                            first.series.clone_from(&unit_series);
                        }
                    }
                }
            }
        }

        if let Some(record) = self.record_mut(&unit_key) {
            record
                .parents
                .retain(|p| p.family_prefix() != RecordFamily::AddMachines.as_str());
            match machine_key {
                Some(machine_key) => record.add_parent(machine_key),
                None => {
                    if let Operation::AddUnits(args) = &mut record.command.call.operation {
                        args.to_machine = Some(machine.to_owned());
                    }
                }
            }
        }

        if let Some(placed) = db.unit_mut(unit) {
            placed.machine = Some(machine.to_owned());
        }
        debug!(unit, machine, "placed unit");
        Ok(())
    }

    /// Take a unit off its machine.
    ///
    /// Uncommitted units become unplaced (and their queued `addUnits` record
    /// forgets the target) and `true` is returned. Units already running on
    /// the backend are marked deleted instead and `false` is returned.
    pub fn unplace_unit(&mut self, unit: &str, db: &mut ModelDb) -> bool {
        let Some(target) = db.unit_mut(unit) else {
            return false;
        };
        if target.agent_state.is_some() {
            target.deleted = true;
            return false;
        }
        target.machine = None;

        if let Some(key) = self.queued_unit(unit) {
            if let Some(record) = self.record_mut(&key) {
                record
                    .parents
                    .retain(|p| p.family_prefix() != RecordFamily::AddMachines.as_str());
                if let Operation::AddUnits(args) = &mut record.command.call.operation {
                    args.to_machine = None;
                }
            }
        }
        debug!(unit, "unplaced unit");
        true
    }

    /// Unplace every placed unit of `application`. Returns the ids touched.
    pub fn unplace_service_units(&mut self, application: &str, db: &mut ModelDb) -> Vec<String> {
        let placed: Vec<String> = db
            .units_of_application(application)
            .filter(|u| u.machine.is_some())
            .map(|u| u.id.clone())
            .collect();
        for unit in &placed {
            self.unplace_unit(unit, db);
        }
        placed
    }
}
