use thiserror::Error;

/// Error taxonomy for the paginated query path.
///
/// `Validation` and `Unavailable` are deliberately distinct: the first is a
/// caller mistake, the second is a retryable infrastructure failure. They are
/// never collapsed into a generic error on the way to the HTTP layer.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Retryable: timeout or connectivity failure against the backing store.
    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    /// Non-retryable backing store failure (bad SQL, corrupt row).
    #[error("Store error: {0}")]
    Store(String),
}
