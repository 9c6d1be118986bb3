//! Symbolic key -> program-counter table with reverse lookup.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointEntry {
    pub key: u16,
    pub pc: u32,
    pub name: &'static str,
}

/// Constructed once per program-kind and immutable thereafter. A pc may
/// repeat across entries; a key never does (enforced at construction).
#[derive(Debug, Clone)]
pub struct BreakpointMap {
    entries: Vec<BreakpointEntry>,
    by_key: HashMap<u16, usize>,
    by_pc: HashMap<u32, u16>,
}

impl BreakpointMap {
    /// Panics if two entries share a key; that is a programming error in
    /// the compiled-in table, not a runtime condition to recover from.
    pub fn new(entries: Vec<BreakpointEntry>) -> BreakpointMap {
        let mut by_key = HashMap::with_capacity(entries.len());
        let mut by_pc = HashMap::with_capacity(entries.len());
        for (idx, e) in entries.iter().enumerate() {
            if by_key.insert(e.key, idx).is_some() {
                panic!("duplicate breakpoint key {} ({})", e.key, e.name);
            }
            // First writer wins on pc collisions; match() only needs to
            // resolve one key per runtime hit.
            by_pc.entry(e.pc).or_insert(e.key);
        }
        BreakpointMap {
            entries,
            by_key,
            by_pc,
        }
    }

    pub fn find(&self, key: u16) -> Option<&BreakpointEntry> {
        self.by_key.get(&key).map(|&idx| &self.entries[idx])
    }

    pub fn pc(&self, key: u16) -> Option<u32> {
        self.find(key).map(|e| e.pc)
    }

    pub fn matches(&self, pc: u32) -> Option<u16> {
        self.by_pc.get(&pc).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    pub fn pcs(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.pc)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BreakpointMap {
        BreakpointMap::new(vec![
            BreakpointEntry {
                key: 1,
                pc: 0x8000_1000,
                name: "battle_start",
            },
            BreakpointEntry {
                key: 2,
                pc: 0x8000_2000,
                name: "turn_decision",
            },
            BreakpointEntry {
                key: 3,
                pc: 0x8000_1000,
                name: "also_battle_start",
            },
        ])
    }

    #[test]
    fn find_and_match_round_trip() {
        let map = sample();
        assert_eq!(map.pc(2), Some(0x8000_2000));
        assert_eq!(map.matches(0x8000_2000), Some(2));
        assert_eq!(map.find(99), None);
        assert_eq!(map.matches(0xdead), None);
    }

    #[test]
    fn repeated_pc_is_allowed() {
        let map = sample();
        // Both keys 1 and 3 share a pc; matches() resolves to whichever
        // was inserted first, which is documented, not unspecified.
        assert_eq!(map.matches(0x8000_1000), Some(1));
    }

    #[test]
    #[should_panic(expected = "duplicate breakpoint key")]
    fn duplicate_key_panics() {
        BreakpointMap::new(vec![
            BreakpointEntry {
                key: 1,
                pc: 1,
                name: "a",
            },
            BreakpointEntry {
                key: 1,
                pc: 2,
                name: "b",
            },
        ]);
    }
}
