use thiserror::Error;

/// Errors surfaced while constructing a table from untrusted parameters
/// (scheme name, initial size). Conditions that the spec treats as fatal
/// at run time — capacity exhaustion, allocation failure — are not part
/// of this enum; they terminate the process directly via `panic!`, since
/// the core does not recover from them (see the error handling design).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HashTableError {
    #[error("unknown table type `{0}`")]
    UnknownScheme(String),
    #[error("table size must be positive, got {0}")]
    NonPositiveSize(i64),
}

pub type Result<T> = std::result::Result<T, HashTableError>;
