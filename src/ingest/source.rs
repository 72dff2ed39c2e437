use anyhow::Result;
use std::{collections::BTreeMap, path::PathBuf};

use crate::process::{load_workbook, Workbook};

/// Where source documents come from. `Ok(None)` means the document is not
/// part of this bundle, which is not an error.
pub trait DocumentSource {
    fn open(&self, name: &str) -> Result<Option<Workbook>>;
}

/// Documents resolved by name under a raw-data directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentSource for DirectorySource {
    fn open(&self, name: &str) -> Result<Option<Workbook>> {
        load_workbook(self.root.join(name))
    }
}

/// In-memory documents keyed by name.
impl DocumentSource for BTreeMap<String, Workbook> {
    fn open(&self, name: &str) -> Result<Option<Workbook>> {
        Ok(self.get(name).cloned())
    }
}
