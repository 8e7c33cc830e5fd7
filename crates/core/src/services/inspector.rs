use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::CFunctionSet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InspectorError {
    #[error("symbol prefix must not be empty")]
    EmptyPrefix,
}

/// Expected C functions per library symbol prefix.
///
/// Owned by one verification run. Registrations are serialized behind a lock
/// so concurrent pipelines for different libraries can share one inspector.
#[derive(Debug, Default)]
pub struct Inspector {
    expected: RwLock<BTreeMap<String, CFunctionSet>>,
}

/// Expected-vs-implemented comparison for a single prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub prefix: String,
    /// Expected and implemented, in extraction order.
    pub found: Vec<String>,
    /// Expected but not implemented, in extraction order.
    pub missing: Vec<String>,
    /// Implemented with the prefix but not in the expected set, sorted.
    pub unexpected: Vec<String>,
}

impl CoverageReport {
    pub fn expected_count(&self) -> usize {
        self.found.len() + self.missing.len()
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `functions` as the expected set for `prefix`, replacing any earlier entry.
    pub fn set_expected(&self, prefix: &str, functions: CFunctionSet) -> Result<(), InspectorError> {
        if prefix.is_empty() {
            return Err(InspectorError::EmptyPrefix);
        }
        tracing::info!(prefix, count = functions.len(), "recorded expected C functions");
        self.expected.write().insert(prefix.to_string(), functions);
        Ok(())
    }

    pub fn expected(&self, prefix: &str) -> Option<CFunctionSet> {
        self.expected.read().get(prefix).cloned()
    }

    pub fn prefixes(&self) -> Vec<String> {
        self.expected.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.expected.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.read().is_empty()
    }

    /// Compare the expected set for `prefix` with the implemented symbol names.
    ///
    /// Only expected functions carrying the prefix count, which drops the stub
    /// marker and anything the headers pull in from libc. Returns `None` when
    /// nothing was registered for `prefix`.
    pub fn report<'a, I>(&self, prefix: &str, implemented: I) -> Option<CoverageReport>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let guard = self.expected.read();
        let expected = guard.get(prefix)?;
        let implemented: BTreeSet<&str> = implemented.into_iter().collect();

        let (found, missing): (Vec<String>, Vec<String>) = expected
            .with_prefix(prefix)
            .map(|f| f.name.clone())
            .partition(|name| implemented.contains(name.as_str()));
        let unexpected = implemented
            .iter()
            .filter(|name| name.starts_with(prefix) && !expected.contains(name))
            .map(|name| name.to_string())
            .collect();

        Some(CoverageReport { prefix: prefix.to_string(), found, missing, unexpected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CFunction;

    fn set(names: &[&str]) -> CFunctionSet {
        CFunctionSet::ensure(names.iter().copied().map(CFunction::new).collect()).unwrap()
    }

    #[test]
    fn set_expected_replaces_instead_of_merging() {
        let inspector = Inspector::new();
        inspector.set_expected("rbd_", set(&["rbd_open", "rbd_close"])).unwrap();
        inspector.set_expected("rbd_", set(&["rbd_stat"])).unwrap();
        assert_eq!(inspector.len(), 1);
        assert_eq!(inspector.expected("rbd_").unwrap().names(), vec!["rbd_stat"]);
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let inspector = Inspector::new();
        assert_eq!(inspector.set_expected("", set(&["x"])), Err(InspectorError::EmptyPrefix));
        assert!(inspector.is_empty());
    }

    #[test]
    fn report_ignores_marker_and_foreign_symbols() {
        let inspector = Inspector::new();
        inspector
            .set_expected("rados_", set(&["rados_create", "malloc", "rados_connect", "foo"]))
            .unwrap();
        let report = inspector
            .report("rados_", ["rados_connect", "rados_bogus", "some_helper"])
            .unwrap();
        assert_eq!(report.found, vec!["rados_connect"]);
        assert_eq!(report.missing, vec!["rados_create"]);
        assert_eq!(report.unexpected, vec!["rados_bogus"]);
        assert_eq!(report.expected_count(), 2);
        assert!(!report.is_complete());
        assert!(inspector.report("ceph_", Vec::<&str>::new()).is_none());
    }
}
