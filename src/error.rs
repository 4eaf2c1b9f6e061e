//! Domain errors that callers need to tell apart. Everything else travels as a
//! plain `anyhow::Error` with context attached.

use thiserror::Error;

/// Highest interchange document version this build understands.
pub const SUPPORTED_EXPORT_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Tasting not found: {0}")]
    NotFound(String),
    #[error("Tasting name is required.")]
    MissingName,
    #[error("Invalid import file: {0}. Please make sure it is a valid SipScribe export file.")]
    InvalidImport(String),
    #[error(
        "Import file version {0} is newer than supported version {SUPPORTED_EXPORT_VERSION}."
    )]
    UnsupportedVersion(u64),
}

impl JournalError {
    /// Look for a `JournalError` anywhere in an error chain.
    pub fn find(err: &anyhow::Error) -> Option<&JournalError> {
        err.chain().find_map(|cause| cause.downcast_ref::<JournalError>())
    }
}
