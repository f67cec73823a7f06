//! The error taxonomy of the import pipeline.
//!
//! Most variants are fatal and abort the whole batch; the exceptions are
//! noted on the variant. The three message-carrying variants at the bottom
//! are the terminal outcomes synthesized by the batch importer: they are the
//! only user-visible surface of a partially failed import.

use std::path::PathBuf;

use thiserror::Error;

/// An error produced while importing an FPS upload.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The uploaded file has an extension outside the allow-list. Rejected
    /// before any disk activity.
    #[error("unsupported file extension {0:?}: upload a .xml or .zip FPS export")]
    UnsupportedFormat(String),

    /// Neither the preferred nor the fallback working directory passed the
    /// write probe.
    #[error("no writable working directory: tried {preferred:?}, then {fallback:?}")]
    WorkspaceUnavailable {
        /// The preferred directory that failed first.
        preferred: PathBuf,
        /// The fallback directory that failed as well.
        fallback: PathBuf,
    },

    /// The uploaded archive does not contain a single XML entry.
    #[error("no XML entry found inside the uploaded archive")]
    NoXmlInArchive,

    /// The uploaded archive cannot be unpacked.
    #[error("failed to unpack the uploaded archive {name:?}")]
    ArchiveUnpack {
        /// The declared filename of the archive.
        name: String,
        /// The underlying unpack failure.
        #[source]
        source: anyhow::Error,
    },

    /// A staged document cannot be read or parsed as well-formed XML.
    /// Recoverable at batch level: the document is recorded as failed and
    /// the remaining documents are still processed.
    #[error("cannot parse {name:?} as well-formed XML")]
    XmlParse {
        /// The filename the failure is attributed to.
        name: String,
        /// The underlying read or parse failure.
        #[source]
        source: anyhow::Error,
    },

    /// A time or memory limit carries a unit the current schema policy does
    /// not recognize. Fatal: the document uses a schema the importer cannot
    /// safely interpret.
    #[error("invalid {field} unit {unit:?}")]
    InvalidUnit {
        /// Which limit the unit belongs to.
        field: &'static str,
        /// The offending unit, lowercased.
        unit: String,
    },

    /// A time or memory limit is missing or its value is not a number.
    /// Fatal, same propagation class as [`ImportError::InvalidUnit`].
    #[error("invalid {field} value {value:?}")]
    InvalidLimit {
        /// Which limit the value belongs to.
        field: &'static str,
        /// The offending raw value.
        value: String,
    },

    /// The language catalog collaborator failed to answer.
    #[error("failed to query the language catalog")]
    Catalog(#[source] anyhow::Error),

    /// A file could not be written or a directory could not be created.
    #[error("cannot write {path:?}")]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The batch produced zero importable problems. The message states which
    /// combination of parse failures and missing-test-data skips occurred.
    #[error("{0}")]
    NothingImported(String),

    /// Some records failed to persist. The message lists the success and
    /// failure counts plus every offending title and filename.
    #[error("{0}")]
    PartlyFailed(String),

    /// Every record persisted, but some documents or items were skipped
    /// along the way. The message lists them.
    #[error("{0}")]
    ImportedWithWarnings(String),
}
