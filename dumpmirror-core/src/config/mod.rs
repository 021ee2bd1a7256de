//! Run configuration.
//!
//! - `credential_file`: JSON credential file loading (host, user, password, output directory)
//! - `dump_tool`: location and arguments of the external dump utility
//!
//! # Security
//! Passwords read from the credential file go straight into a
//! [`ConnectionProfile`](crate::security::ConnectionProfile) and are never
//! kept in these structs.

mod credential_file;
mod dump_tool;

pub use credential_file::{CredentialFile, load_credential_file, parse_credential_file};
pub use dump_tool::{BUNDLED_TOOL_PATH, DEFAULT_PROGRAM, DumpToolConfig};
