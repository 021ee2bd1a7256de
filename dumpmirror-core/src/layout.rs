//! Run directory layout.
//!
//! Every run writes into `<base>/dump_<timestamp>` and, when mirroring,
//! `<base>/dump_<timestamp>_mirror`. Both roots are created before the first
//! dump process starts and an existing root is never reused. A run that
//! cannot create both roots leaves neither behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tracing::{debug, warn};

use crate::error::DumpMirrorError;

/// Timestamp format used in run root names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const ROOT_PREFIX: &str = "dump_";
const MIRROR_SUFFIX: &str = "_mirror";

/// The directories of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    timestamp: String,
    output_root: PathBuf,
    mirror_root: Option<PathBuf>,
}

impl RunLayout {
    /// Computes the run roots under `base` without touching the filesystem.
    pub fn plan<Tz: TimeZone>(base: &Path, mirror: bool, started_at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let timestamp = started_at.format(TIMESTAMP_FORMAT).to_string();
        let output_root = base.join(format!("{ROOT_PREFIX}{timestamp}"));
        let mirror_root =
            mirror.then(|| base.join(format!("{ROOT_PREFIX}{timestamp}{MIRROR_SUFFIX}")));

        Self {
            timestamp,
            output_root,
            mirror_root,
        }
    }

    /// Computes and creates the run roots.
    ///
    /// Ancestors of each root are created as needed; the roots themselves must
    /// not exist yet.
    ///
    /// # Errors
    /// Returns `DirectoryCreation` if a root already exists (as a directory or
    /// anything else) or cannot be created.
    ///
    /// # Example
    /// ```rust
    /// use dumpmirror_core::layout::RunLayout;
    ///
    /// let base = tempfile::tempdir()?;
    /// let now = chrono::Local::now();
    /// let layout = RunLayout::create(base.path(), true, &now)?;
    /// assert!(layout.output_root().is_dir());
    /// assert!(layout.mirror_root().is_some_and(|m| m.is_dir()));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn create<Tz: TimeZone>(
        base: &Path,
        mirror: bool,
        started_at: &DateTime<Tz>,
    ) -> crate::Result<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        let layout = Self::plan(base, mirror, started_at);

        create_root(&layout.output_root)?;
        if let Some(mirror_root) = &layout.mirror_root
            && let Err(e) = create_root(mirror_root)
        {
            // The output root was created just above and is still empty.
            if let Err(cleanup) = std::fs::remove_dir(&layout.output_root) {
                warn!(
                    "Could not remove {}: {cleanup}",
                    layout.output_root.display()
                );
            }
            return Err(e);
        }

        Ok(layout)
    }

    /// Run timestamp as embedded in the root names.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Root of the real dump.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Root of the schema mirror, when mirroring.
    pub fn mirror_root(&self) -> Option<&Path> {
        self.mirror_root.as_deref()
    }
}

fn create_root(root: &Path) -> crate::Result<()> {
    let directory_error = |source: std::io::Error| DumpMirrorError::DirectoryCreation {
        path: root.to_path_buf(),
        source,
    };

    if let Some(parent) = root.parent() {
        std::fs::create_dir_all(parent).map_err(directory_error)?;
    }
    std::fs::create_dir(root).map_err(directory_error)?;

    debug!("Created run directory {}", root.display());
    Ok(())
}
