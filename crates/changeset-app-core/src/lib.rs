// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for change-set tools (config, notifications).
//! Keeps the engine and its front-ends free of storage and presentation details.

pub mod config;
pub mod notify;
