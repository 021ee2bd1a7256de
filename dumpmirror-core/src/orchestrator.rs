//! Run orchestration.
//!
//! One run: resolve targets, create the run roots, dump every target in
//! order, then synthesize the schema mirror once over the finished tree. The
//! first failing target ends the run and no mirror is written.

use std::path::PathBuf;

use chrono::Local;
use tracing::info;

use crate::Result;
use crate::dump::{DumpDriver, DumpExecutor};
use crate::error::DumpMirrorError;
use crate::layout::RunLayout;
use crate::mirror::synthesize_mirror;
use crate::models::{RunReport, Target};
use crate::targets::resolve_targets;

/// Options for a backup run.
///
/// # Example
/// ```rust
/// use dumpmirror_core::orchestrator::BackupOptions;
///
/// let options = BackupOptions::new("/var/backups/mongo")
///     .with_mirror(false)
///     .with_schema_only(true);
/// assert!(!options.mirror);
/// assert!(options.schema_only);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    /// Directory under which the run roots are created
    pub output_base: PathBuf,
    /// Synthesize a schema mirror after the dump.
    /// Default: true
    pub mirror: bool,
    /// Ask the dump utility itself to skip documents.
    /// Default: false
    pub schema_only: bool,
}

impl BackupOptions {
    /// Creates options with mirroring on and in-tool schema-only mode off.
    pub fn new(output_base: impl Into<PathBuf>) -> Self {
        Self {
            output_base: output_base.into(),
            mirror: true,
            schema_only: false,
        }
    }

    /// Sets whether to synthesize the schema mirror.
    pub const fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Sets whether units run in the utility's schema-only mode.
    pub const fn with_schema_only(mut self, schema_only: bool) -> Self {
        self.schema_only = schema_only;
        self
    }
}

/// Sequences a single backup run.
pub struct Orchestrator<E: DumpExecutor> {
    executor: E,
    options: BackupOptions,
}

impl<E: DumpExecutor> Orchestrator<E> {
    /// Creates an orchestrator that launches dumps through `executor`.
    pub const fn new(executor: E, options: BackupOptions) -> Self {
        Self { executor, options }
    }

    /// The executor used for dump units.
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Resolves `selection` and runs the backup.
    ///
    /// A malformed selection fails before any directory is created.
    ///
    /// # Errors
    /// See [`Orchestrator::run_targets`]; additionally `MalformedSelection`.
    pub async fn run(&self, selection: &str) -> Result<RunReport> {
        let targets = resolve_targets(selection)?;
        self.run_targets(&targets).await
    }

    /// Runs the backup for already resolved targets.
    ///
    /// # Errors
    /// - `Configuration` when schema-only mode meets a whole-database target
    /// - `DirectoryCreation` when the run roots cannot be created
    /// - `ProcessLaunch` / `DumpUtility` from the first failing target
    /// - `Io` when the finished dump tree cannot be read for mirroring
    pub async fn run_targets(&self, targets: &[Target]) -> Result<RunReport> {
        if self.options.schema_only {
            check_schema_only(targets)?;
        }

        let layout = RunLayout::create(
            &self.options.output_base,
            self.options.mirror,
            &Local::now(),
        )?;

        info!("Starting MongoDB dump of {} database(s)...", targets.len());
        info!("Output: {}", layout.output_root().display());

        let driver = DumpDriver::new(&self.executor, self.options.schema_only);
        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            reports.push(driver.dump(target, &layout).await?);
        }

        let mirror = match layout.mirror_root() {
            Some(mirror_root) if !reports.is_empty() => {
                info!("Synthesizing schema mirror in {}", mirror_root.display());
                Some(synthesize_mirror(layout.output_root(), mirror_root)?)
            }
            Some(_) => {
                info!("No databases dumped, skipping schema mirror");
                None
            }
            None => None,
        };

        info!("MongoDB dump completed.");

        Ok(RunReport {
            timestamp: layout.timestamp().to_string(),
            output_root: layout.output_root().to_path_buf(),
            mirror_root: layout.mirror_root().map(std::path::Path::to_path_buf),
            targets: reports,
            mirror,
        })
    }
}

/// mongodump applies a query only to a single collection.
fn check_schema_only(targets: &[Target]) -> Result<()> {
    match targets.iter().find(|target| target.is_whole_database()) {
        Some(target) => Err(DumpMirrorError::configuration(format!(
            "schema-only dumps need explicit collections, but database '{}' is selected whole; \
             list its collections in the selection",
            target.database
        ))),
        None => Ok(()),
    }
}
