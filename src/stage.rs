//! Staging of an uploaded file into a list of raw XML sources.
//!
//! A plain `.xml` upload yields exactly one in-memory unit. A `.zip` upload
//! is persisted into a unique staging directory, unpacked in place, and
//! every entry named `*.xml` (case-insensitive, any nesting depth) becomes a
//! unit. The staging directory is only needed while the units are parsed;
//! the batch importer sweeps it afterwards.

use std::borrow::Cow;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use scopeguard::ScopeGuard;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::ImportError;

/// Extension of a plain FPS document upload.
pub const XML_EXTENSION: &str = "xml";
/// Extension of a bundled FPS archive upload.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// An uploaded file as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    /// The original filename as declared by the client.
    pub filename: String,
    /// The raw file content.
    pub bytes: Vec<u8>,
}

/// One staged XML source, ready to be parsed.
#[derive(Debug)]
pub struct ImportUnit {
    name: String,
    source: UnitSource,
}

#[derive(Debug)]
enum UnitSource {
    Memory(Vec<u8>),
    File(PathBuf),
}

impl ImportUnit {
    pub(crate) fn from_memory(name: impl Into<String>, bytes: Vec<u8>) -> ImportUnit {
        ImportUnit {
            name: name.into(),
            source: UnitSource::Memory(bytes),
        }
    }

    pub(crate) fn from_file(name: impl Into<String>, path: PathBuf) -> ImportUnit {
        ImportUnit {
            name: name.into(),
            source: UnitSource::File(path),
        }
    }

    /// The filename document-level failures are attributed to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw XML bytes of this unit.
    pub(crate) fn read(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match &self.source {
            UnitSource::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
            UnitSource::File(path) => Ok(Cow::Owned(fs::read(path)?)),
        }
    }
}

/// A staged upload: the units to parse plus the staging directory to sweep
/// once parsing is done (zip uploads only).
#[derive(Debug)]
pub struct StagedUpload {
    units: Vec<ImportUnit>,
    staging_dir: Option<PathBuf>,
}

impl StagedUpload {
    /// The staged XML sources, in a deterministic order.
    pub fn units(&self) -> &[ImportUnit] {
        &self.units
    }

    /// The staging directory holding the unpacked archive, if any.
    pub fn staging_dir(&self) -> Option<&Path> {
        self.staging_dir.as_deref()
    }
}

/// The substring after the last `.` of `filename`, empty when there is none.
fn extension(filename: &str) -> &str {
    filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Reject uploads whose extension is outside the allow-list. Called before
/// any disk activity.
pub(crate) fn check_extension(filename: &str) -> Result<(), ImportError> {
    let ext = extension(filename);
    if ext.eq_ignore_ascii_case(XML_EXTENSION) || ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION) {
        Ok(())
    } else {
        Err(ImportError::UnsupportedFormat(ext.to_string()))
    }
}

/// Stage `upload` into a list of raw XML sources under `staging_base`.
pub fn stage(upload: &Upload, staging_base: &Path) -> Result<StagedUpload, ImportError> {
    let ext = extension(&upload.filename).to_ascii_lowercase();
    match ext.as_str() {
        XML_EXTENSION => Ok(StagedUpload {
            units: vec![ImportUnit::from_memory(
                upload.filename.clone(),
                upload.bytes.clone(),
            )],
            staging_dir: None,
        }),
        ARCHIVE_EXTENSION => stage_archive(upload, staging_base),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}

/// Persist and unpack a zip upload, then discover its XML entries.
fn stage_archive(upload: &Upload, staging_base: &Path) -> Result<StagedUpload, ImportError> {
    let staging_dir = staging_base.join(Uuid::new_v4().simple().to_string());
    fs::create_dir_all(&staging_dir).map_err(|e| ImportError::Io {
        path: staging_dir.clone(),
        source: e,
    })?;
    // until staging succeeds the directory is ours to sweep
    let guard = scopeguard::guard(staging_dir.clone(), |dir| {
        if let Err(e) = fs::remove_dir_all(&dir) {
            warn!("cannot remove staging directory {}: {}", dir.display(), e);
        }
    });

    let archive_name = Path::new(&upload.filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.zip".to_string());
    let archive_path = staging_dir.join(&archive_name);
    fs::write(&archive_path, &upload.bytes).map_err(|e| ImportError::Io {
        path: archive_path.clone(),
        source: e,
    })?;
    debug!("staged uploaded archive at {}", archive_path.display());

    let file = File::open(&archive_path).map_err(|e| ImportError::Io {
        path: archive_path.clone(),
        source: e,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ImportError::ArchiveUnpack {
        name: upload.filename.clone(),
        source: e.into(),
    })?;
    archive
        .extract(&staging_dir)
        .map_err(|e| ImportError::ArchiveUnpack {
            name: upload.filename.clone(),
            source: e.into(),
        })?;
    drop(archive);
    fs::remove_file(&archive_path).map_err(|e| ImportError::Io {
        path: archive_path.clone(),
        source: e,
    })?;

    let mut xml_files: Vec<PathBuf> = WalkDir::new(&staging_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case(XML_EXTENSION))
                .unwrap_or(false)
        })
        .collect();
    // walkdir order depends on the filesystem, the document order must not
    xml_files.sort();
    if xml_files.is_empty() {
        return Err(ImportError::NoXmlInArchive);
    }
    info!(
        "found {} XML document(s) inside {:?}",
        xml_files.len(),
        upload.filename
    );

    let staging_dir = ScopeGuard::into_inner(guard);
    let units = xml_files
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            ImportUnit::from_file(name, path)
        })
        .collect();
    Ok(StagedUpload {
        units,
        staging_dir: Some(staging_dir),
    })
}
