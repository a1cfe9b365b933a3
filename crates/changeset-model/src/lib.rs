// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! changeset-model: the live model store the change-set engine reads and
//! mutates.
//!
//! Entities are either real (confirmed by the backend) or ghosts that only
//! exist client-side until the change set commits. Every lookup is by stable
//! identifier and every mutation is visible to the next read.
#![forbid(unsafe_code)]

mod db;
mod entity;
mod series;

pub use db::ModelDb;
pub use entity::{
    Application, CommitStatus, ConfigMap, Endpoint, Machine, Relation, Unit, GHOST_MARKER,
};
pub use series::{series_from_charm_url, unit_number};
