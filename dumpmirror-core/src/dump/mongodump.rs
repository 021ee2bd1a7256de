//! `mongodump` process executor.

use std::ffi::OsString;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use zeroize::Zeroizing;

use super::{DumpExecutor, UnitStatus};
use crate::Result;
use crate::config::DumpToolConfig;
use crate::error::DumpMirrorError;
use crate::models::DumpUnit;
use crate::security::ConnectionProfile;

/// Runs `mongodump` as a child process and waits for it to exit.
///
/// The child inherits stdout and stderr so its progress output reaches the
/// operator; stdin is closed.
pub struct MongodumpExecutor {
    tool: DumpToolConfig,
    uri: Zeroizing<String>,
    redacted_uri: String,
}

impl MongodumpExecutor {
    /// Creates an executor for `profile` using the configured utility.
    ///
    /// # Errors
    /// Returns a configuration error if the tool configuration is invalid or
    /// the profile cannot produce a connection string.
    pub fn new(tool: DumpToolConfig, profile: &ConnectionProfile) -> Result<Self> {
        tool.validate()?;
        Ok(Self {
            uri: profile.connection_uri()?,
            redacted_uri: profile.redacted(),
            tool,
        })
    }

    /// The configured utility.
    pub const fn tool(&self) -> &DumpToolConfig {
        &self.tool
    }

    /// Command-line arguments for `unit`, using `uri` as the connection string.
    fn arguments(&self, unit: &DumpUnit, uri: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--uri".into(),
            uri.into(),
            "--db".into(),
            unit.database.as_str().into(),
        ];
        if let Some(collection) = &unit.collection {
            args.push("--collection".into());
            args.push(collection.as_str().into());
        }
        args.push("--out".into());
        args.push(unit.destination.as_os_str().to_os_string());
        // --query is rejected by mongodump without --collection
        if unit.schema_only && unit.collection.is_some() {
            args.extend(self.tool.schema_only_args.iter().map(OsString::from));
        }
        args
    }
}

#[async_trait]
impl DumpExecutor for MongodumpExecutor {
    async fn execute(&self, unit: &DumpUnit) -> Result<UnitStatus> {
        let shown: Vec<String> = self
            .arguments(unit, &self.redacted_uri)
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        debug!("Running {} {}", self.tool.program_name(), shown.join(" "));

        let status = Command::new(&self.tool.program)
            .args(self.arguments(unit, &self.uri))
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| DumpMirrorError::ProcessLaunch {
                program: self.tool.program_name(),
                source,
            })?;

        debug!("{} exited with {}", self.tool.program_name(), status);

        if status.success() {
            Ok(UnitStatus::Succeeded)
        } else {
            Ok(UnitStatus::Failed {
                exit_code: status.code(),
            })
        }
    }
}
