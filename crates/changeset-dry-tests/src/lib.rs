// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for change-set crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`model`] - Fluent builder for ghost and real model entities
//! - [`hooks`] - Callbacks and hooks that count and capture invocations
//! - [`transport`] - Recording transport that logs every dispatched operation

pub mod config;
pub mod model;
pub mod hooks;
pub mod transport;

pub use config::InMemoryConfigStore;
pub use model::ModelBuilder;
pub use hooks::HookCounter;
pub use transport::RecordingTransport;
