//! Credential protection for dump runs.
//!
//! - `credentials`: secure credential container with automatic memory zeroing
//! - `profile`: connection profile validation and URI assembly
//! - `uri`: seed-list aware connection string splitting and redaction
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers for automatic memory clearing
//! - Debug output and error messages only ever show redacted connection strings

mod credentials;
mod profile;
mod uri;

pub use credentials::Credentials;
pub use profile::ConnectionProfile;
pub(crate) use uri::ConnectionString;
