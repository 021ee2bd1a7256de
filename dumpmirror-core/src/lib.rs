//! Core library for dumpmirror.
//!
//! Drives `mongodump` once per selected database or collection into a dated
//! output tree, then synthesizes a schema mirror of that tree: every
//! `.metadata.json` sidecar copied byte for byte next to an empty `.bson`
//! data file. The mirror is a schema-only backup obtained without a second
//! dump pass.
//!
//! # Security Guarantees
//! - Passwords live in zeroizing containers and are wiped on drop
//! - Connection strings are only logged or displayed in redacted form
//! - Error messages never carry credentials
//!
//! # Architecture
//! - [`targets`] parses the selection list into ordered targets
//! - [`layout`] creates the timestamped run roots
//! - [`dump`] launches the dump utility per unit behind [`dump::DumpExecutor`]
//! - [`mirror`] walks the finished dump and writes the mirror
//! - [`orchestrator`] sequences one run and returns a [`RunReport`]

pub mod config;
pub mod dump;
pub mod error;
pub mod layout;
pub mod logging;
pub mod mirror;
pub mod models;
pub mod orchestrator;
pub mod security;
pub mod targets;

// Re-export commonly used types
pub use config::{CredentialFile, DumpToolConfig, load_credential_file};
pub use dump::{DumpDriver, DumpExecutor, MongodumpExecutor, UnitStatus};
pub use error::{DumpMirrorError, Result, redact_database_url};
pub use layout::RunLayout;
pub use mirror::synthesize_mirror;
pub use models::{
    DumpUnit, MirrorFailure, MirrorReport, MirroredPair, RunReport, Target, TargetReport,
};
pub use orchestrator::{BackupOptions, Orchestrator};
pub use security::{ConnectionProfile, Credentials};
pub use targets::resolve_targets;
