//! Set of proposal IDs that reached a terminal state.
//!
//! Stored as a comma-separated string (`"1,2,3"`) because the key-value
//! stores it lives in only hold strings. IDs are only ever added.

use crate::error::{GovernanceError, Result};
use crate::proposal::ProposalId;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Insert-only set of proposal IDs that are no longer polled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    ids: BTreeSet<ProposalId>,
}

impl IgnoreSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored representation.
    ///
    /// Empty segments are skipped so values like `""` or `"1,"` load fine.
    pub fn parse(value: &str) -> Result<Self> {
        let mut ids = BTreeSet::new();
        for segment in value.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let id = segment.parse::<ProposalId>().map_err(|e| {
                GovernanceError::InvalidIgnoreSet(format!("{:?}: {}", segment, e))
            })?;
            ids.insert(id);
        }
        Ok(Self { ids })
    }

    /// Add an ID, returning `true` if it was not already present
    pub fn insert(&mut self, id: ProposalId) -> bool {
        self.ids.insert(id)
    }

    /// Whether the ID is ignored
    pub fn contains(&self, id: ProposalId) -> bool {
        self.ids.contains(&id)
    }

    /// Number of ignored IDs
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no ID is ignored
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// IDs in ascending order
    pub fn iter(&self) -> impl Iterator<Item = ProposalId> + '_ {
        self.ids.iter().copied()
    }

    /// Representation written back to the store
    pub fn to_storage_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IgnoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.ids {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}", id)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for IgnoreSet {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromIterator<ProposalId> for IgnoreSet {
    fn from_iter<I: IntoIterator<Item = ProposalId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn test_storage_format() {
        let set: IgnoreSet = [4, 1, 3, 2].into_iter().collect();
        assert_eq!(set.to_storage_string(), "1,2,3,4");
        assert_eq!(IgnoreSet::new().to_storage_string(), "");
    }

    #[test]
    fn test_parse_tolerates_legacy_values() {
        assert!(IgnoreSet::parse("").unwrap().is_empty());
        let set = IgnoreSet::parse(" 1, 5,,").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_matches!(
            IgnoreSet::parse("1,two,3"),
            Err(GovernanceError::InvalidIgnoreSet(_))
        );
    }

    #[test]
    fn test_insert_reports_novelty() {
        let mut set = IgnoreSet::new();
        assert!(set.insert(9));
        assert!(!set.insert(9));
        assert!(set.contains(9));
        assert_eq!(set.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_stored_value_reloads_identically(ids in proptest::collection::btree_set(any::<u64>(), 0..32)) {
            let set: IgnoreSet = ids.into_iter().collect();
            let reloaded = IgnoreSet::parse(&set.to_storage_string()).unwrap();
            prop_assert_eq!(reloaded, set);
        }
    }
}
