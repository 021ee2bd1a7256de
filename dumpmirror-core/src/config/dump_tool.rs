//! External dump utility configuration.

use std::path::{Path, PathBuf};

use crate::error::DumpMirrorError;

/// Location of the bundled utility, relative to the running executable.
pub const BUNDLED_TOOL_PATH: &str = "mongo_tools/bin/mongodump";

/// Program name resolved through `PATH` when no bundled copy exists.
pub const DEFAULT_PROGRAM: &str = "mongodump";

/// How to invoke the external dump utility.
///
/// # Example
/// ```rust
/// use dumpmirror_core::config::DumpToolConfig;
///
/// let tool = DumpToolConfig::new("/opt/mongo-tools/bin/mongodump")
///     .with_schema_only_args(vec!["--query".into(), r#"{"_id":{"$exists":false}}"#.into()]);
/// assert!(tool.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpToolConfig {
    /// Program to execute
    pub program: PathBuf,
    /// Arguments appended when a unit runs in schema-only mode.
    ///
    /// mongodump has no dedicated no-data switch; the default filter matches
    /// no document, so the tool still writes metadata and an empty data file.
    pub schema_only_args: Vec<String>,
}

impl Default for DumpToolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl DumpToolConfig {
    /// Creates a configuration for `program` with the default schema-only filter.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            schema_only_args: vec![
                "--query".to_string(),
                r#"{"_id":{"$exists":false}}"#.to_string(),
            ],
        }
    }

    /// Replaces the schema-only arguments.
    pub fn with_schema_only_args(mut self, args: Vec<String>) -> Self {
        self.schema_only_args = args;
        self
    }

    /// Picks the bundled utility next to the running executable when present,
    /// falling back to [`DEFAULT_PROGRAM`] on `PATH`.
    pub fn locate() -> Self {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().and_then(Self::bundled_in))
            .map_or_else(Self::default, Self::new)
    }

    /// Returns the bundled utility path under `dir` if it exists as a file.
    pub fn bundled_in(dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join(BUNDLED_TOOL_PATH);
        candidate.is_file().then_some(candidate)
    }

    /// Display name of the program for logs and errors.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a configuration error when the program path is empty.
    pub fn validate(&self) -> crate::Result<()> {
        if self.program.as_os_str().is_empty() {
            return Err(DumpMirrorError::configuration(
                "dump utility path cannot be empty",
            ));
        }
        Ok(())
    }
}
