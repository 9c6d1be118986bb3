//! The Key Registry: the union of per-module Context Store key tables
//!, plus the Breakpoint Map.
//!
//! Registry construction is validated once, lazily, the first time
//! [`registry()`] is called, mirroring the donor's fail-fast startup
//! checks (e.g. `vm/src/primitives/consts.rs` style compile-time
//! invariants via `static_assertions`, extended here with a runtime pass
//! because the table is assembled from several modules).

mod breakpoint_map;
pub mod keys;

pub use breakpoint_map::{BreakpointEntry, BreakpointMap};

use once_cell::sync::Lazy;
use std::collections::HashSet;
use thiserror::Error;

/// One entry in a module's key table: `(constant_name, id, string_name)`.
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub const_name: &'static str,
    pub id: u16,
    pub string_name: &'static str,
}

/// A module's reserved id range, inclusive on both ends.
#[derive(Debug, Clone, Copy)]
pub struct ReservedRange {
    pub module: &'static str,
    pub min: u16,
    pub max: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate key id {0} (first in {1}, again in {2})")]
    DuplicateId(u16, &'static str, &'static str),
    #[error("duplicate key name {0:?} (first in {1}, again in {2})")]
    DuplicateName(&'static str, &'static str, &'static str),
    #[error("key id {id} ({name}) falls outside its module's reserved range [{min}, {max}]")]
    OutOfRange {
        id: u16,
        name: &'static str,
        min: u16,
        max: u16,
    },
}

/// A validated, flattened view of every module table.
pub struct Registry {
    entries: Vec<RegistryEntry>,
    fingerprint: u64,
}

impl Registry {
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// A deterministic fingerprint over the validated table, for
    /// compatibility checks between a worker and the program it loads
    ///.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn find_by_id(&self, id: u16) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.string_name == name)
    }
}

fn fnv1a(entries: &[RegistryEntry]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for e in entries {
        for byte in e.id.to_le_bytes().iter().chain(e.string_name.as_bytes()) {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    hash
}

fn validate(
    tables: &[(&'static [RegistryEntry], ReservedRange)],
) -> Result<Registry, RegistryError> {
    let mut seen_ids: HashSet<u16> = HashSet::new();
    let mut seen_names: HashSet<&'static str> = HashSet::new();
    let mut id_owner: Vec<(u16, &'static str)> = Vec::new();
    let mut name_owner: Vec<(&'static str, &'static str)> = Vec::new();
    let mut flattened = Vec::new();

    for (table, range) in tables {
        for entry in *table {
            if entry.id < range.min || entry.id > range.max {
                return Err(RegistryError::OutOfRange {
                    id: entry.id,
                    name: entry.string_name,
                    min: range.min,
                    max: range.max,
                });
            }
            if !seen_ids.insert(entry.id) {
                let (_, owner) = id_owner.iter().find(|(id, _)| *id == entry.id).unwrap();
                return Err(RegistryError::DuplicateId(entry.id, owner, range.module));
            }
            if !seen_names.insert(entry.string_name) {
                let (_, owner) = name_owner
.iter()
.find(|(n, _)| *n == entry.string_name)
.unwrap();
                return Err(RegistryError::DuplicateName(
                    entry.string_name,
                    owner,
                    range.module,
                ));
            }
            id_owner.push((entry.id, range.module));
            name_owner.push((entry.string_name, range.module));
            flattened.push(*entry);
        }
    }

    let fingerprint = fnv1a(&flattened);
    Ok(Registry {
        entries: flattened,
        fingerprint,
    })
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    validate(&[
        (keys::core::TABLE, keys::core::RANGE),
        (keys::seed_probe::TABLE, keys::seed_probe::RANGE),
        (keys::tas_movie::TABLE, keys::tas_movie::RANGE),
        (keys::battle::TABLE, keys::battle::RANGE),
    ])
.expect("key registry validation failed at startup")
});

/// The process-wide validated registry. Panics on first access if the
/// compiled-in tables are malformed; this is a configuration failure
///.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_is_valid() {
        let r = registry();
        assert!(!r.entries().is_empty());
        assert!(r.find_by_id(keys::core::OUTCOME_CODE).is_some());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        const A: [RegistryEntry; 1] = [RegistryEntry {
            const_name: "A",
            id: 5,
            string_name: "a",
        }];
        const B: [RegistryEntry; 1] = [RegistryEntry {
            const_name: "B",
            id: 5,
            string_name: "b",
        }];
        let err = validate(&[
            (
                &A,
                ReservedRange {
                    module: "a",
                    min: 0,
                    max: 10,
                },
            ),
            (
                &B,
                ReservedRange {
                    module: "b",
                    min: 0,
                    max: 10,
                },
            ),
        ])
.unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId(5, "a", "b"));
    }

    #[test]
    fn out_of_range_is_rejected() {
        const A: [RegistryEntry; 1] = [RegistryEntry {
            const_name: "A",
            id: 500,
            string_name: "a",
        }];
        let err = validate(&[(
            &A,
            ReservedRange {
                module: "a",
                min: 0,
                max: 10,
            },
        )])
.unwrap_err();
        assert!(matches!(err, RegistryError::OutOfRange {.. }));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = registry().fingerprint();
        let b = registry().fingerprint();
        assert_eq!(a, b);
    }
}
