//! Core data models for dump runs.
//!
//! Targets and dump units describe what a run will do; the report types
//! record what it did. Reports serialize to JSON for the `--report` output.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// A database selected for backup.
///
/// An empty `collections` list means every collection of the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub database: String,
    pub collections: Vec<String>,
}

impl Target {
    /// Creates a whole-database target.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Vec::new(),
        }
    }

    /// Creates a target restricted to the given collections.
    pub fn with_collections<I, S>(database: impl Into<String>, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            database: database.into(),
            collections: collections.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the target covers every collection of its database.
    pub fn is_whole_database(&self) -> bool {
        self.collections.is_empty()
    }

    /// Expands the target into the dump units it requires.
    ///
    /// A whole-database target yields exactly one unit; otherwise there is
    /// one unit per collection, in selection order, all sharing `destination`.
    ///
    /// # Example
    /// ```rust
    /// use dumpmirror_core::models::Target;
    /// use std::path::Path;
    ///
    /// let sales = Target::with_collections("sales", ["orders", "invoices"]);
    /// assert_eq!(sales.dump_units(Path::new("/backups/run"), false).len(), 2);
    /// assert_eq!(Target::new("inventory").dump_units(Path::new("/backups/run"), false).len(), 1);
    /// ```
    pub fn dump_units(&self, destination: &Path, schema_only: bool) -> Vec<DumpUnit> {
        if self.is_whole_database() {
            return vec![DumpUnit {
                database: self.database.clone(),
                collection: None,
                destination: destination.to_path_buf(),
                schema_only,
            }];
        }

        self.collections
            .iter()
            .map(|collection| DumpUnit {
                database: self.database.clone(),
                collection: Some(collection.clone()),
                destination: destination.to_path_buf(),
                schema_only,
            })
            .collect()
    }
}

/// One invocation of the external dump utility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpUnit {
    pub database: String,
    pub collection: Option<String>,
    pub destination: PathBuf,
    /// Ask the utility itself to skip documents
    pub schema_only: bool,
}

impl DumpUnit {
    /// `database` or `database.collection`, for logs.
    pub fn label(&self) -> String {
        match &self.collection {
            Some(collection) => format!("{}.{}", self.database, collection),
            None => self.database.clone(),
        }
    }
}

/// Result of dumping one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub database: String,
    pub units: Vec<DumpUnit>,
    pub duration_ms: u64,
}

/// A metadata file and its synthesized data file, relative to the mirror root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirroredPair {
    pub metadata: PathBuf,
    pub data: PathBuf,
}

/// A sidecar pair (or directory) the mirror could not be written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one mirror synthesis pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MirrorReport {
    pub pairs: Vec<MirroredPair>,
    pub failures: Vec<MirrorFailure>,
}

impl MirrorReport {
    /// True when every discovered pair was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub timestamp: String,
    pub output_root: PathBuf,
    pub mirror_root: Option<PathBuf>,
    pub targets: Vec<TargetReport>,
    pub mirror: Option<MirrorReport>,
}

impl RunReport {
    /// Number of dump units executed across all targets.
    pub fn unit_count(&self) -> usize {
        self.targets.iter().map(|t| t.units.len()).sum()
    }

    /// A run is degraded when the mirror recorded any failure.
    pub fn is_degraded(&self) -> bool {
        self.mirror.as_ref().is_some_and(|m| !m.is_complete())
    }
}
