// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Record keys and the key generator.

use serde::{Deserialize, Serialize};

/// Command family a record key is prefixed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordFamily {
    /// `addCharm-N`
    AddCharm,
    /// `service-N` (deploy)
    Service,
    /// `destroyApplication-N`
    DestroyApplication,
    /// `destroyMachines-N`
    DestroyMachines,
    /// `setConfig-N`
    SetConfig,
    /// `addRelation-N`
    AddRelation,
    /// `removeRelation-N`
    RemoveRelation,
    /// `removeUnit-N`
    RemoveUnit,
    /// `expose-N`
    Expose,
    /// `unexpose-N`
    Unexpose,
    /// `addMachines-N`
    AddMachines,
    /// `addUnits-N`
    AddUnits,
}

impl RecordFamily {
    /// Key prefix for this family.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddCharm => "addCharm",
            Self::Service => "service",
            Self::DestroyApplication => "destroyApplication",
            Self::DestroyMachines => "destroyMachines",
            Self::SetConfig => "setConfig",
            Self::AddRelation => "addRelation",
            Self::RemoveRelation => "removeRelation",
            Self::RemoveUnit => "removeUnit",
            Self::Expose => "expose",
            Self::Unexpose => "unexpose",
            Self::AddMachines => "addMachines",
            Self::AddUnits => "addUnits",
        }
    }
}

impl core::fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a change-set record, `"{family}-{n}"`.
///
/// # Invariants
/// - Keys produced by one [`KeyGenerator`] never repeat, so a key is never
///   reused while (or after) the record it named is live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(String);

impl RecordKey {
    /// Wrap an existing key string (e.g. one received from a UI layer).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The family prefix (everything before the last `-`).
    pub fn family_prefix(&self) -> &str {
        self.0.rsplit_once('-').map_or(self.0.as_str(), |(f, _)| f)
    }
}

impl core::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Store-scoped monotonic key source.
///
/// The counter is shared across families: `service-0`, `addUnits-1`,
/// `service-2`. Generation is synchronous, so two creations can never observe
/// the same counter value.
#[derive(Debug, Default)]
pub struct KeyGenerator {
    next: u64,
}

impl KeyGenerator {
    /// Fresh generator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next key for `family`.
    pub fn next_key(&mut self, family: RecordFamily) -> RecordKey {
        let n = self.next;
        // u64 exhaustion is not reachable in practice; wrapping would break
        // uniqueness, so saturate and let the duplicate surface in debug.
        self.next = self.next.saturating_add(1);
        debug_assert!(n < u64::MAX, "record key space exhausted");
        RecordKey(format!("{family}-{n}"))
    }

    /// Number of keys issued so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}
