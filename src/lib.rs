//! Batch importer for the legacy FPS problem-archive format.
//!
//! An FPS export is a single XML document, or a zip archive bundling several
//! of them, where each `<item>` element describes one problem: statement
//! text, optional inline images, resource limits in mixed units, sample and
//! judge test data, code templates and an optional special judge. This crate
//! turns such an upload into normalized [`ImportResult`]s, materializing the
//! judge test data as `1.in`/`1.out` file pairs under a working directory,
//! and hands each record to a caller-supplied persistence layer.
//!
//! The pipeline is tolerant of partial failures at two levels: a document
//! that is not well-formed XML is recorded and skipped without aborting the
//! batch, and an item without any test data is recorded and dropped without
//! affecting its siblings. All partial failures are folded into a single
//! terminal outcome, see [`FpsImporter::import`].
//!
//! ```no_run
//! use fps_import::{FpsImporter, ImportConfig, Upload};
//! # use fps_import::{Language, LanguageCatalog, ImportResult, ProblemStore, StoreError};
//! # struct Catalog;
//! # impl LanguageCatalog for Catalog {
//! #     fn list_languages(&self, _tag: &str) -> anyhow::Result<Vec<Language>> { Ok(vec![]) }
//! # }
//! # struct Store;
//! # impl ProblemStore for Store {
//! #     fn add_problem(&mut self, _problem: &ImportResult) -> Result<bool, StoreError> { Ok(true) }
//! # }
//!
//! let config = ImportConfig {
//!     testcase_dir: "/data/file/testcase".into(),
//!     testcase_fallback_dir: "/tmp/fps/testcase".into(),
//!     asset_dir: "/data/file/md".into(),
//!     asset_fallback_dir: "/tmp/fps/md".into(),
//!     asset_url_prefix: "/api/public/img/".into(),
//! };
//! let catalog = Catalog;
//! let mut store = Store;
//! let upload = Upload {
//!     filename: "problems.zip".into(),
//!     bytes: std::fs::read("problems.zip").unwrap(),
//! };
//! let mut importer = FpsImporter::new(&config, &catalog, &mut store);
//! importer.import(&upload, "admin").unwrap();
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

use std::path::PathBuf;

pub mod catalog;
pub mod error;
mod fps;
pub mod import;
pub mod record;
pub mod stage;
pub mod store;
pub mod workdir;

pub use catalog::{Language, LanguageCatalog, LOCAL_LANGUAGE_TAG};
pub use error::ImportError;
pub use import::{BatchOutcome, FpsImporter};
pub use record::{CodeTemplateEntry, ImportResult, JudgeMode, ProblemRecord, TestCase};
pub use stage::{ImportUnit, StagedUpload, Upload};
pub use store::{ProblemStore, StoreError};
pub use workdir::resolve_writable_dir;

/// Filesystem and publishing configuration of the importer.
///
/// Each working directory comes with a fallback: the importer probes the
/// preferred path first and falls back exactly once, see
/// [`resolve_writable_dir`].
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Preferred base directory for staged archives and materialized test cases.
    pub testcase_dir: PathBuf,
    /// Fallback used when `testcase_dir` fails the write probe.
    pub testcase_fallback_dir: PathBuf,
    /// Preferred directory for the image assets referenced by problem statements.
    pub asset_dir: PathBuf,
    /// Fallback used when `asset_dir` fails the write probe.
    pub asset_fallback_dir: PathBuf,
    /// Public URL prefix under which the written image files are served.
    pub asset_url_prefix: String,
}
