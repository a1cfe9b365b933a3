// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Clearing the current index and reverting its ghost-model edits.

use changeset_model::{Application, ModelDb};
use tracing::{info, instrument, warn};

use crate::change_set::ChangeSet;
use crate::error::ChangeSetError;
use crate::event::ChangeSetEvent;
use crate::hierarchy::HierarchyMode;
use crate::key::RecordKey;
use crate::operation::Operation;
use crate::record::Call;

impl ChangeSet {
    /// Drop every record of the current index and undo what each one did to
    /// the model, children before parents. Advances the index and returns the
    /// number of records dropped.
    #[instrument(skip_all, fields(index = self.current_index()))]
    pub fn clear(&mut self, db: &mut ModelDb) -> usize {
        let levels = match self.build_hierarchy(HierarchyMode::All, db) {
            Ok(levels) => levels,
            Err(err) => {
                warn!(error = %err, "clearing in reverse insertion order");
                let index = self.current_index();
                vec![self.find_records(|r| r.index == index)]
            }
        };
        for level in levels.iter().rev() {
            for key in level.iter().rev() {
                if let Some(record) = self.record(key) {
                    revert(record.call(), db);
                }
            }
        }
        let dropped = self.drop_current_index();
        self.advance_index();
        self.emit(ChangeSetEvent::ChangeSetModified);
        info!(dropped, "change set cleared");
        dropped
    }

    /// Remove a queued record and revert its model edits, leaving the rest of
    /// the index alone.
    pub fn discard_record(
        &mut self,
        key: &RecordKey,
        db: &mut ModelDb,
    ) -> Result<(), ChangeSetError> {
        let record = self
            .remove_record(key)
            .ok_or_else(|| ChangeSetError::UnknownRecord(key.clone()))?;
        revert(record.call(), db);
        Ok(())
    }
}

fn application_mut<'a>(db: &'a mut ModelDb, id_or_name: &str) -> Option<&'a mut Application> {
    let id = db
        .application(id_or_name)
        .or_else(|| db.application_by_name(id_or_name))
        .map(|a| a.id.clone())?;
    db.application_mut(&id)
}

/// Undo the model edits a queued call made when it was recorded.
fn revert(call: &Call, db: &mut ModelDb) {
    match &call.operation {
        // Charms stay in the model; leaving them costs nothing.
        Operation::AddCharm(_) => {}
        Operation::Deploy(_) => {
            if let Some(id) = call.model_id() {
                db.remove_application(id);
            }
        }
        Operation::DestroyApplication { application } => {
            if let Some(app) = application_mut(db, application) {
                app.deleted = false;
            }
        }
        Operation::DestroyMachines(args) => {
            for machine in &args.machines {
                let mut affected = db.descendants(machine);
                affected.push(machine.clone());
                for id in &affected {
                    if let Some(m) = db.machine_mut(id) {
                        m.deleted = false;
                    }
                }
                let units: Vec<String> = db
                    .units_on_machine(machine, true)
                    .iter()
                    .map(|u| u.id.clone())
                    .collect();
                for id in &units {
                    if let Some(u) = db.unit_mut(id) {
                        u.deleted = false;
                    }
                }
            }
        }
        Operation::SetConfig { application, .. } => {
            if let Some(app) = application_mut(db, application) {
                let restored = app
                    .config
                    .keys()
                    .map(|k| {
                        let value = app
                            .environment_config
                            .get(k)
                            .cloned()
                            .unwrap_or(serde_json::Value::Null);
                        (k.clone(), value)
                    })
                    .collect();
                app.config = restored;
                app.dirty_fields.clear();
            }
        }
        Operation::AddRelation { .. } => {
            if let Some(id) = call.model_id() {
                db.remove_relation(id);
            }
        }
        Operation::RemoveRelation { endpoints } => {
            if let Some(relation) = db.relation_from_endpoints_mut(endpoints) {
                relation.deleted = false;
            }
        }
        Operation::RemoveUnits { units } => {
            for id in units {
                if let Some(u) = db.unit_mut(id) {
                    u.deleted = false;
                }
            }
        }
        Operation::Expose { application } => {
            if let Some(app) = application_mut(db, application) {
                app.exposed = false;
            }
        }
        Operation::Unexpose { application } => {
            if let Some(app) = application_mut(db, application) {
                app.exposed = true;
            }
        }
        Operation::AddMachines { .. } => {
            if let Some(id) = call.model_id() {
                db.remove_machine(id);
            }
        }
        Operation::AddUnits(_) => {
            if let Some(id) = call.model_id() {
                db.remove_unit(id);
            }
        }
    }
}
