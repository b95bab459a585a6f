//! Version identifiers of the form `v<generation>-<index>`
//!
//! The generation is always one more than the parent's; the index only
//! disambiguates versions that share a generation. Two siblings of different
//! parents can share a generation, so lineage lives in `VersionMeta::parent`
//! and never in the id itself.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use treesnap_core::{Result, SnapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId {
    generation: u32,
    index: u32,
}

impl VersionId {
    /// The sole root version, `v1-1`
    pub const ROOT: VersionId = VersionId {
        generation: 1,
        index: 1,
    };

    pub fn new(generation: u32, index: u32) -> Self {
        Self { generation, index }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Allocate an id for a new version
    ///
    /// - no parent: `v1-1`
    /// - parent `v<G>-<I>`: `v<G+1>-<n>` where `n` is one past the highest
    ///   index already used in generation `G+1`
    ///
    /// Names in `existing` that are not version ids are ignored. Whether the
    /// root is already taken is for the caller to check.
    pub fn allocate<'a, I>(existing: I, parent: Option<&VersionId>) -> Result<VersionId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(parent) = parent else {
            return Ok(VersionId::ROOT);
        };

        let generation = parent
            .generation
            .checked_add(1)
            .ok_or_else(|| {
                SnapError::InvalidVersionId(format!("v{}-1", u64::from(parent.generation) + 1))
            })?;
        let max_index = existing
            .into_iter()
            .filter_map(|name| name.parse::<VersionId>().ok())
            .filter(|id| id.generation == generation)
            .map(|id| id.index)
            .max()
            .unwrap_or(0);
        let index = max_index
            .checked_add(1)
            .ok_or_else(|| {
                SnapError::InvalidVersionId(format!("v{}-{}", generation, u64::from(max_index) + 1))
            })?;

        Ok(VersionId::new(generation, index))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}-{}", self.generation, self.index)
    }
}

impl FromStr for VersionId {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SnapError::InvalidVersionId(s.to_string());

        let rest = s.strip_prefix('v').ok_or_else(invalid)?;
        let (generation, index) = rest.split_once('-').ok_or_else(invalid)?;

        let parse = |part: &str| -> Result<u32> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u32>().map_err(|_| invalid())
        };

        let generation = parse(generation)?;
        let index = parse(index)?;
        if generation == 0 || index == 0 {
            return Err(invalid());
        }

        Ok(VersionId::new(generation, index))
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> VersionId {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let v = id("v12-3");
        assert_eq!(v.generation(), 12);
        assert_eq!(v.index(), 3);
        assert_eq!(v.to_string(), "v12-3");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "v", "v1", "1-1", "V1-1", "v1-", "v-1", "v1-1-20240101", "v0-1", "v1-0", "v+1-1"] {
            assert!(bad.parse::<VersionId>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_root_allocation() {
        assert_eq!(VersionId::allocate(Vec::<&str>::new(), None).unwrap(), VersionId::ROOT);
        // Without a parent the answer is always v1-1
        assert_eq!(VersionId::allocate(["v1-1", "v2-1"], None).unwrap(), VersionId::ROOT);
    }

    #[test]
    fn test_child_allocation() {
        let existing = ["v1-1"];
        assert_eq!(VersionId::allocate(existing, Some(&id("v1-1"))).unwrap(), id("v2-1"));
    }

    #[test]
    fn test_sibling_gets_next_index() {
        let existing = ["v1-1", "v2-1"];
        assert_eq!(VersionId::allocate(existing, Some(&id("v1-1"))).unwrap(), id("v2-2"));
    }

    #[test]
    fn test_different_parents_share_generation_counter() {
        // v2-1 and v2-2 are both children of v1-1; children of either land in generation 3
        let existing = ["v1-1", "v2-1", "v2-2", "v3-1"];
        assert_eq!(VersionId::allocate(existing, Some(&id("v2-2"))).unwrap(), id("v3-2"));
        assert_eq!(VersionId::allocate(existing, Some(&id("v2-1"))).unwrap(), id("v3-2"));
    }

    #[test]
    fn test_uses_max_not_count() {
        let existing = ["v1-1", "v2-1", "v2-7"];
        assert_eq!(VersionId::allocate(existing, Some(&id("v1-1"))).unwrap(), id("v2-8"));
    }

    #[test]
    fn test_ignores_foreign_names() {
        let existing = ["v1-1", "tmp", ".restore-x", "v2-abc", "v21-4"];
        assert_eq!(VersionId::allocate(existing, Some(&id("v1-1"))).unwrap(), id("v2-1"));
    }

    #[test]
    fn test_generation_overflow_is_rejected() {
        let last = id("v4294967295-1");
        let err = VersionId::allocate(["v1-1"], Some(&last)).unwrap_err();
        assert_eq!(err.kind(), treesnap_core::ErrorKind::Invalid);
    }

    #[test]
    fn test_index_overflow_is_rejected() {
        let existing = ["v1-1", "v2-4294967295"];
        let err = VersionId::allocate(existing, Some(&id("v1-1"))).unwrap_err();
        assert_eq!(err.kind(), treesnap_core::ErrorKind::Invalid);
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut ids = vec![id("v10-1"), id("v2-2"), id("v2-10"), id("v1-1")];
        ids.sort();
        assert_eq!(
            ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["v1-1", "v2-2", "v2-10", "v10-1"]
        );
    }
}
