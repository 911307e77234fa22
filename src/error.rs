use thiserror::Error;

/// Errors surfaced by the board core.
///
/// Recoverable kinds (`StoreUnavailable`, transient upload failures) are
/// reported through notifications and logged; the rest indicate a refused
/// operation and leave all state untouched.
#[derive(Error, Debug)]
pub enum BoardError {
    /// A canvas or asset does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed id, filename, or payload; rejected before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A tree edit that would create a cycle or dangle a parent.
    #[error("invalid tree edit: {0}")]
    InvalidTreeEdit(String),

    /// Transport or filesystem failure talking to the store.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal consistency guard tripped; the operation failed without
    /// corrupting the scene.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, BoardError>;
