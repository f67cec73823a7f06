//! End-to-end batch scenarios driving [`FpsImporter`] with mock
//! collaborators and real files on disk.

use std::io::Write;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use fps_import::{
    FpsImporter, ImportConfig, ImportError, ImportResult, Language, LanguageCatalog, ProblemStore,
    StoreError, Upload,
};

struct FixedCatalog;

impl LanguageCatalog for FixedCatalog {
    fn list_languages(&self, _tag: &str) -> anyhow::Result<Vec<Language>> {
        Ok(vec![
            Language {
                id: 1,
                name: "C".into(),
            },
            Language {
                id: 7,
                name: "Python3".into(),
            },
        ])
    }
}

/// A store that records every accepted title and fails on demand.
#[derive(Default)]
struct RecordingStore {
    added: Vec<ImportResult>,
    duplicates: Vec<String>,
    broken: Vec<String>,
    rejected: Vec<String>,
}

impl ProblemStore for RecordingStore {
    fn add_problem(&mut self, problem: &ImportResult) -> Result<bool, StoreError> {
        let title = problem.problem.title.clone();
        if self.duplicates.iter().any(|t| *t == title) {
            return Err(StoreError::DuplicateTitle(title));
        }
        if self.broken.iter().any(|t| *t == title) {
            return Err(StoreError::Other(anyhow::anyhow!("connection reset")));
        }
        if self.rejected.iter().any(|t| *t == title) {
            return Ok(false);
        }
        self.added.push(problem.clone());
        Ok(true)
    }
}

fn config(base: &Path) -> ImportConfig {
    ImportConfig {
        testcase_dir: base.join("testcase"),
        testcase_fallback_dir: base.join("testcase-fallback"),
        asset_dir: base.join("md"),
        asset_fallback_dir: base.join("md-fallback"),
        asset_url_prefix: "/api/public/img/".into(),
    }
}

fn item(title: &str, test_inputs: usize) -> String {
    let cases: String = (0..test_inputs)
        .map(|i| {
            format!(
                "<test_input>in {i}</test_input><test_output>out {i}</test_output>",
                i = i
            )
        })
        .collect();
    format!(
        r#"<item>
  <title>{title}</title>
  <description><![CDATA[about {title}]]></description>
  <input><![CDATA[input spec]]></input>
  <output><![CDATA[output spec]]></output>
  <hint></hint>
  <source>archive</source>
  <time_limit unit="s">1</time_limit>
  <memory_limit unit="mb">128</memory_limit>
  {cases}
</item>"#,
        title = title,
        cases = cases
    )
}

fn document(items: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<fps version=\"1.2\">{}</fps>",
        items.concat()
    )
}

fn zip_upload(name: &str, entries: &[(&str, &str)]) -> Upload {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (entry_name, content) in entries {
        writer.start_file(entry_name.to_string(), options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    Upload {
        filename: name.into(),
        bytes: writer.finish().unwrap().into_inner(),
    }
}

#[test]
fn single_document_imports_in_document_order() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore::default();
    let upload = Upload {
        filename: "problems.xml".into(),
        bytes: document(&[item("First", 2), item("Second", 1)]).into_bytes(),
    };

    FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap();

    let titles: Vec<_> = store
        .added
        .iter()
        .map(|result| result.problem.title.as_str())
        .collect();
    assert_eq!(titles, vec!["First", "Second"]);
    for result in &store.added {
        assert_eq!(result.problem.author, "alice");
        assert!(result.testcase_dir.is_dir());
        assert!(result.testcase_dir.join("1.in").is_file());
    }
    // the two items share one run directory, numbered 1 and 2
    assert!(store.added[0].testcase_dir.ends_with("1"));
    assert!(store.added[1].testcase_dir.ends_with("2"));
}

#[test]
fn unknown_extensions_are_rejected_before_anything_happens() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore::default();
    let upload = Upload {
        filename: "problems.tar.gz".into(),
        bytes: vec![],
    };

    let err = FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(ext) if ext == "gz"));
    assert!(store.added.is_empty());
    // not even the working directories were provisioned
    assert!(!config.testcase_dir.exists());
}

#[test]
fn one_malformed_document_does_not_abort_the_archive() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore::default();
    let upload = zip_upload(
        "pack.zip",
        &[
            ("a.xml", &document(&[item("Alpha", 1)])),
            ("broken.xml", "<fps><item>"),
            ("c.xml", &document(&[item("Gamma", 1)])),
        ],
    );

    let err = FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap_err();
    let ImportError::ImportedWithWarnings(message) = err else {
        panic!("expected a warning outcome");
    };
    assert!(message.contains("unparsable XML files: [broken.xml]"));

    let titles: Vec<_> = store
        .added
        .iter()
        .map(|result| result.problem.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Gamma"]);
}

#[test]
fn staging_directory_is_swept_after_parsing() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore::default();
    let upload = zip_upload("pack.zip", &[("a.xml", &document(&[item("Alpha", 1)]))]);

    FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap();

    // only run directories remain under the working base: no staged XML
    // survives the batch
    let leftover_xml: Vec<_> = walk_files(&config.testcase_dir)
        .into_iter()
        .filter(|path| path.extension().map(|e| e == "xml").unwrap_or(false))
        .collect();
    assert_eq!(leftover_xml, Vec::<std::path::PathBuf>::new());
    // the imported problem still owns its test case files
    assert!(store.added[0].testcase_dir.join("1.in").is_file());
}

#[test]
fn reimporting_tallies_duplicates_without_crashing() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore::default();
    let upload = Upload {
        filename: "problems.xml".into(),
        bytes: document(&[item("A + B", 1)]).into_bytes(),
    };

    FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap();

    // the title now collides
    store.duplicates.push("A + B".into());
    let err = FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap_err();
    let ImportError::PartlyFailed(message) = err else {
        panic!("expected a hard failure");
    };
    assert!(message.contains("imported 0 problem(s), 1 failed"));
    assert!(message.contains("duplicate titles: [A + B]"));
}

#[test]
fn unknown_store_failures_are_tallied_by_title() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore {
        broken: vec!["Bad".into()],
        ..RecordingStore::default()
    };
    let upload = Upload {
        filename: "problems.xml".into(),
        bytes: document(&[item("Good", 1), item("Bad", 1)]).into_bytes(),
    };

    let err = FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap_err();
    let ImportError::PartlyFailed(message) = err else {
        panic!("expected a hard failure");
    };
    assert!(message.contains("imported 1 problem(s), 1 failed"));
    assert!(message.contains("failed for unknown reasons: [Bad]"));
}

#[test]
fn silently_rejected_records_only_move_the_counter() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore {
        rejected: vec!["Quiet".into()],
        ..RecordingStore::default()
    };
    let upload = Upload {
        filename: "problems.xml".into(),
        bytes: document(&[item("Quiet", 1)]).into_bytes(),
    };

    let err = FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap_err();
    let ImportError::PartlyFailed(message) = err else {
        panic!("expected a hard failure");
    };
    assert!(message.contains("imported 0 problem(s), 1 failed"));
    // the rejected title is not listed anywhere
    assert!(!message.contains("Quiet"));
}

#[test]
fn batch_with_only_skipped_items_fails_with_their_titles() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore::default();
    let upload = Upload {
        filename: "problems.xml".into(),
        bytes: document(&[item("No cases", 0)]).into_bytes(),
    };

    let err = FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap_err();
    let ImportError::NothingImported(message) = err else {
        panic!("expected a nothing-imported outcome");
    };
    assert!(message.contains("[No cases]"));
    assert!(store.added.is_empty());
}

#[test]
fn archive_without_xml_entries_is_rejected() {
    let base = TempDir::new().unwrap();
    let config = config(base.path());
    let catalog = FixedCatalog;
    let mut store = RecordingStore::default();
    let upload = zip_upload("pack.zip", &[("readme.txt", "nothing here")]);

    let err = FpsImporter::new(&config, &catalog, &mut store)
        .import(&upload, "alice")
        .unwrap_err();
    assert!(matches!(err, ImportError::NoXmlInArchive));
}

fn walk_files(base: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(base) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk_files(&path));
        } else {
            files.push(path);
        }
    }
    files
}
