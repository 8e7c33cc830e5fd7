//! Typed model of C function declarations extracted from an AST dump.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One declared parameter of a C function.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CArgument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Type id as referenced by the extractor (e.g. `_42`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
}

/// One extracted C function declaration. Identity is by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Return type id as referenced by the extractor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<CArgument>,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub is_extern: bool,
    #[serde(default)]
    pub is_inline: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl CFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("function element #{index} has an empty or missing name")]
    MissingName { index: usize },
}

/// Ordered set of C functions, in the order encountered in the AST payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CFunctionSet {
    functions: Vec<CFunction>,
}

impl CFunctionSet {
    /// Validate a raw decoded list and build the canonical set.
    ///
    /// Fails as a whole if any entry has an empty name. Repeated names keep
    /// the first occurrence only.
    pub fn ensure(raw: Vec<CFunction>) -> Result<Self, ModelError> {
        if let Some(index) = raw.iter().position(|f| f.name.trim().is_empty()) {
            return Err(ModelError::MissingName { index });
        }
        let mut seen = HashSet::new();
        let functions = raw.into_iter().filter(|f| seen.insert(f.name.clone())).collect();
        Ok(Self { functions })
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CFunction> {
        self.functions.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&CFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Functions whose names start with `prefix`, in original order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a CFunction> + 'a {
        self.functions.iter().filter(move |f| f.name.starts_with(prefix))
    }
}

impl<'a> IntoIterator for &'a CFunctionSet {
    type Item = &'a CFunction;
    type IntoIter = std::slice::Iter<'a, CFunction>;

    fn into_iter(self) -> Self::IntoIter {
        self.functions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_rejects_whole_set_on_empty_name() {
        let raw = vec![CFunction::new("rados_create"), CFunction::new(""), CFunction::new("foo")];
        assert_eq!(CFunctionSet::ensure(raw), Err(ModelError::MissingName { index: 1 }));
    }

    #[test]
    fn ensure_keeps_first_occurrence_of_repeated_names() {
        let mut second = CFunction::new("rbd_open");
        second.line = Some(99);
        let raw = vec![CFunction::new("rbd_open"), CFunction::new("rbd_close"), second];
        let set = CFunctionSet::ensure(raw).unwrap();
        assert_eq!(set.names(), vec!["rbd_open", "rbd_close"]);
        assert_eq!(set.get("rbd_open").unwrap().line, None);
    }

    #[test]
    fn with_prefix_filters_in_order() {
        let raw = ["ceph_mount", "foo", "ceph_unmount", "free"].map(CFunction::new).to_vec();
        let set = CFunctionSet::ensure(raw).unwrap();
        let names: Vec<_> = set.with_prefix("ceph_").map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ceph_mount", "ceph_unmount"]);
    }
}
