// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Engine settings persisted through the config service.

use std::time::Duration;

use changeset_app_core::notify::NotificationService;
use serde::{Deserialize, Serialize};

/// Key the settings are stored under.
pub const CONFIG_KEY: &str = "changeset";

/// Tunables for a [`ChangeSet`](crate::ChangeSet) and the model it drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSetConfig {
    /// Hold back `addUnits` records whose unit has no machine, moving them to
    /// the next commit index.
    pub defer_unplaced_units: bool,
    /// Lifetime of user-facing notifications, in milliseconds.
    pub notification_ttl_ms: u64,
    /// Maximum notifications retained.
    pub max_notifications: usize,
}

impl Default for ChangeSetConfig {
    fn default() -> Self {
        Self {
            defer_unplaced_units: true,
            notification_ttl_ms: 10_000,
            max_notifications: 32,
        }
    }
}

impl ChangeSetConfig {
    /// Notification queue sized per these settings.
    pub fn notification_service(&self) -> NotificationService {
        NotificationService::new(
            self.max_notifications,
            Duration::from_millis(self.notification_ttl_ms),
        )
    }
}
