//! Dump driver.
//!
//! Runs the external dump utility for one target at a time. A target with
//! named collections gets one unit per collection, otherwise a single
//! whole-database unit. Units run strictly one after another, and the first
//! failure aborts the rest of the target.
//!
//! Process launching sits behind [`DumpExecutor`] so the driver can be tested
//! with doubles and the utility swapped without touching the control flow.

mod mongodump;

use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

pub use mongodump::MongodumpExecutor;

use crate::Result;
use crate::error::DumpMirrorError;
use crate::layout::RunLayout;
use crate::models::{DumpUnit, Target, TargetReport};

/// How a dump unit ended once the utility was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// Zero exit status
    Succeeded,
    /// Non-zero exit, or no exit code when the child was killed by a signal
    Failed { exit_code: Option<i32> },
}

/// Launches the external dump utility for a single unit.
#[async_trait]
pub trait DumpExecutor: Send + Sync {
    /// Runs one unit to completion.
    ///
    /// Implementations must not return before the underlying process exits.
    ///
    /// # Errors
    /// Returns `ProcessLaunch` when the utility cannot be started.
    async fn execute(&self, unit: &DumpUnit) -> Result<UnitStatus>;
}

/// Drives the dump units of each target through an executor.
pub struct DumpDriver<'a, E: DumpExecutor + ?Sized> {
    executor: &'a E,
    schema_only: bool,
}

impl<'a, E: DumpExecutor + ?Sized> DumpDriver<'a, E> {
    /// Creates a driver. With `schema_only` every unit asks the utility
    /// itself to skip documents.
    pub const fn new(executor: &'a E, schema_only: bool) -> Self {
        Self {
            executor,
            schema_only,
        }
    }

    /// Dumps one target into the run's output root.
    ///
    /// # Errors
    /// Returns the first `ProcessLaunch` or `DumpUtility` failure; later units
    /// of the target are not attempted.
    pub async fn dump(&self, target: &Target, layout: &RunLayout) -> Result<TargetReport> {
        let started = Instant::now();
        let units = target.dump_units(layout.output_root(), self.schema_only);

        if target.is_whole_database() {
            info!("Dumping ALL collections from database: {}", target.database);
        } else {
            info!(
                "Dumping {} collection(s) from database: {}",
                units.len(),
                target.database
            );
        }

        for unit in &units {
            info!("Dumping {}", unit.label());

            match self.executor.execute(unit).await {
                Ok(UnitStatus::Succeeded) => {}
                Ok(UnitStatus::Failed { exit_code }) => {
                    error!("Dump utility failed for {}", unit.label());
                    return Err(DumpMirrorError::DumpUtility {
                        database: unit.database.clone(),
                        collection: unit.collection.clone(),
                        exit_code,
                    });
                }
                Err(e) => {
                    error!("Could not run dump utility for {}: {}", unit.label(), e);
                    return Err(e);
                }
            }
        }

        info!("Successfully dumped {}", target.database);

        Ok(TargetReport {
            database: target.database.clone(),
            units,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
