//! The persistence collaborator that receives the normalized records.

use thiserror::Error;

use crate::record::ImportResult;

/// An error returned by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A problem with the same title already exists. Recoverable: the batch
    /// importer tallies the title and moves on.
    #[error("a problem titled {0:?} already exists")]
    DuplicateTitle(String),

    /// Any other persistence failure. Recoverable: logged with full detail,
    /// tallied as an unknown failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Stores one imported problem per call.
///
/// The implementation is assumed to be internally safe for concurrent
/// per-record writes; the importer itself calls it sequentially.
pub trait ProblemStore {
    /// Persist one problem. A `false` return means the store rejected the
    /// record without raising an error.
    fn add_problem(&mut self, problem: &ImportResult) -> Result<bool, StoreError>;
}
