//! The FPS document parser.
//!
//! One staged XML source is turned into zero or more [`ImportResult`]s plus
//! the titles of the items that were skipped for missing test data. The
//! parser owns every directory and file it creates: image assets are
//! published under the asset directory, test cases are materialized under a
//! per-document run directory, and the run directory is handed over to the
//! returned results (or removed when there is nothing to hand over).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use scopeguard::ScopeGuard;
use uuid::Uuid;

use crate::catalog::{Language, LanguageCatalog, FPS_LANGUAGE_NAMES, LOCAL_LANGUAGE_TAG};
use crate::error::ImportError;
use crate::record::{CodeTemplateEntry, ImportResult, JudgeMode, ProblemRecord, TestCase};
use crate::stage::ImportUnit;

mod limits;
mod xml;

use limits::SchemaVersion;
use xml::Element;

/// Everything a document parse needs besides the XML itself.
pub(crate) struct ParseContext<'a> {
    /// Resolved base directory for the materialized test cases.
    pub workdir: &'a Path,
    /// Resolved directory the image assets are published under.
    pub asset_dir: &'a Path,
    /// Public URL prefix of the published image assets.
    pub asset_url_prefix: &'a str,
    /// Display identifier of the importing user.
    pub author: &'a str,
    /// The live language catalog.
    pub catalog: &'a dyn LanguageCatalog,
}

/// The outcome of parsing one staged document.
#[derive(Debug)]
pub(crate) struct ParsedDocument {
    /// One result per item that carries test data, in document order.
    pub results: Vec<ImportResult>,
    /// Titles of the items dropped for missing test data.
    pub skipped: Vec<String>,
}

/// What a single `<item>` element produced.
enum ItemOutcome {
    Imported(Box<ImportResult>),
    NoTestData(String),
}

/// Parse one staged document into normalized import results.
///
/// Fails with [`ImportError::XmlParse`] when the unit cannot be read or is
/// not well-formed XML; that failure is recoverable at batch level. Every
/// other error is fatal for the whole batch.
pub(crate) fn parse_document(
    unit: &ImportUnit,
    ctx: &ParseContext,
) -> Result<ParsedDocument, ImportError> {
    let xml_parse = |source: anyhow::Error| ImportError::XmlParse {
        name: unit.name().to_string(),
        source,
    };
    let bytes = unit.read().map_err(|e| xml_parse(e.into()))?;
    let root = xml::parse(&bytes).map_err(xml_parse)?;
    let version = SchemaVersion::from_attr(root.attr("version"));

    let languages = ctx
        .catalog
        .list_languages(LOCAL_LANGUAGE_TAG)
        .map_err(ImportError::Catalog)?;
    let language_ids: HashMap<&str, i64> = languages
        .iter()
        .map(|language| (language.name.as_str(), language.id))
        .collect();

    let run_dir = ctx.workdir.join(Uuid::new_v4().simple().to_string());
    fs::create_dir_all(&run_dir).map_err(|e| ImportError::Io {
        path: run_dir.clone(),
        source: e,
    })?;
    info!(
        "materializing test cases of {:?} under {}",
        unit.name(),
        run_dir.display()
    );
    // swept unless at least one item survives: the surviving results are the
    // only consumers of this directory
    let run_dir_guard = scopeguard::guard(run_dir.clone(), |dir| {
        if let Err(e) = fs::remove_dir_all(&dir) {
            warn!("cannot remove run directory {}: {}", dir.display(), e);
        }
    });

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    // skipped items do not consume an index, the next item reuses it
    let mut index = 1;
    for item in root.children_named("item") {
        match parse_item(item, ctx, &run_dir, index, version, &languages, &language_ids)? {
            ItemOutcome::Imported(result) => {
                results.push(*result);
                index += 1;
            }
            ItemOutcome::NoTestData(title) => {
                warn!("problem {:?} carries no test data, skipping", title);
                skipped.push(title);
            }
        }
    }

    if results.is_empty() {
        drop(run_dir_guard);
    } else {
        ScopeGuard::into_inner(run_dir_guard);
    }
    Ok(ParsedDocument { results, skipped })
}

/// Extract one `<item>` element, materializing its image assets and test
/// case files on the way.
fn parse_item(
    item: &Element,
    ctx: &ParseContext,
    run_dir: &Path,
    index: usize,
    version: SchemaVersion,
    languages: &[Language],
    language_ids: &HashMap<&str, i64>,
) -> Result<ItemOutcome, ImportError> {
    let title = text_of(item, "title");

    // images are published as soon as they are seen, even if the item is
    // later dropped for missing test data
    let substitutions = publish_images(item, ctx)?;
    let description = substitute(text_of(item, "description"), &substitutions);
    let input = substitute(text_of(item, "input"), &substitutions);
    let output = substitute(text_of(item, "output"), &substitutions);
    let hint = substitute(text_of(item, "hint"), &substitutions);
    let source = text_of(item, "source");

    let time_limit = limits::time_limit(item, version)?;
    let memory_limit = limits::memory_limit(item, version)?;
    let examples = interleave_samples(item);
    let code_templates = extract_templates(item, language_ids);
    let special_judge = extract_special_judge(item);

    let case_dir = run_dir.join(index.to_string());
    fs::create_dir_all(&case_dir).map_err(|e| ImportError::Io {
        path: case_dir.clone(),
        source: e,
    })?;
    let inputs: Vec<&Element> = item.children_named("test_input").collect();
    let outputs: Vec<&Element> = item.children_named("test_output").collect();
    if inputs.is_empty() {
        let _ = fs::remove_dir_all(&case_dir);
        return Ok(ItemOutcome::NoTestData(title));
    }
    let mut test_cases = Vec::with_capacity(inputs.len());
    for (i, test_input) in inputs.iter().enumerate() {
        let input_name = format!("{}.in", i + 1);
        let output_name = format!("{}.out", i + 1);
        // a missing output at this position still yields a (empty) file:
        // every referenced case exists on disk
        let output_content = outputs
            .get(i)
            .map(|element| element.text_content())
            .unwrap_or_default();
        write_case_file(&case_dir.join(&input_name), &test_input.text_content())?;
        write_case_file(&case_dir.join(&output_name), &output_content)?;
        test_cases.push(TestCase {
            input: input_name,
            output: output_name,
        });
    }
    debug!(
        "problem {:?}: wrote {} test case(s) under {}",
        title,
        test_cases.len(),
        case_dir.display()
    );

    let judge_mode = if special_judge.is_some() {
        JudgeMode::SpecialJudge
    } else {
        JudgeMode::Default
    };
    let (spj_language, spj_code) = match special_judge {
        Some((language, code)) => (Some(language), Some(code)),
        None => (None, None),
    };
    let problem = ProblemRecord {
        title,
        description,
        input,
        output,
        examples,
        hint,
        source,
        time_limit,
        memory_limit,
        author: ctx.author.to_string(),
        spj_language,
        spj_code,
        ..ProblemRecord::default()
    };
    Ok(ItemOutcome::Imported(Box::new(ImportResult {
        problem,
        test_cases,
        testcase_dir: case_dir,
        languages: languages.to_vec(),
        judge_mode,
        code_templates,
        uploaded_test_cases: true,
    })))
}

/// The text content of the first child named `name`, empty when absent.
fn text_of(item: &Element, name: &str) -> String {
    item.child(name)
        .map(Element::text_content)
        .unwrap_or_default()
}

/// Decode and publish every inline image of `item`, returning the
/// substitution list from declared source path to public asset URL, in
/// document order.
fn publish_images(
    item: &Element,
    ctx: &ParseContext,
) -> Result<Vec<(String, String)>, ImportError> {
    let mut substitutions = Vec::new();
    for img in item.children_named("img") {
        let Some(src) = img.child("src") else {
            continue;
        };
        let src = src.text_content();
        let Some(payload) = img.child("base64") else {
            warn!("image {:?} has no inline payload, leaving it unresolved", src);
            continue;
        };
        let mut encoded = payload.text_content();
        encoded.retain(|c| !c.is_ascii_whitespace());
        let bytes = match BASE64_STANDARD.decode(encoded.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("cannot decode image {:?}: {}", src, e);
                continue;
            }
        };
        // keep the declared extension, whatever it is
        let extension = src.rsplit('.').next().unwrap_or(&src);
        let filename = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let path = ctx.asset_dir.join(&filename);
        fs::write(&path, &bytes).map_err(|e| ImportError::Io {
            path: path.clone(),
            source: e,
        })?;
        debug!("published image {:?} as {}", src, path.display());
        substitutions.push((src, format!("{}{}", ctx.asset_url_prefix, filename)));
    }
    Ok(substitutions)
}

/// Apply the image substitutions to a rich-text field, literal substring
/// replacement in insertion order.
fn substitute(text: String, substitutions: &[(String, String)]) -> String {
    substitutions
        .iter()
        .fold(text, |text, (from, to)| text.replace(from, to))
}

/// Interleave the sample inputs and outputs into one markup string. The
/// shorter list decides how many pairs are emitted, surplus samples are
/// dropped.
fn interleave_samples(item: &Element) -> String {
    let inputs: Vec<&Element> = item.children_named("sample_input").collect();
    let outputs: Vec<&Element> = item.children_named("sample_output").collect();
    let count = inputs.len().min(outputs.len());
    let mut examples = String::new();
    for i in 0..count {
        examples.push_str(&format!(
            "<input>{}</input><output>{}</output>",
            inputs[i].text_content(),
            outputs[i].text_content()
        ));
    }
    examples
}

/// Resolve the code templates of `item` against the language catalog.
/// Templates whose language is unmapped or absent from the catalog are
/// dropped silently.
fn extract_templates(item: &Element, language_ids: &HashMap<&str, i64>) -> Vec<CodeTemplateEntry> {
    let mut templates = Vec::new();
    for node in item.children_named("template") {
        let Some(fps_name) = node.attr("language") else {
            continue;
        };
        let Some(catalog_name) = FPS_LANGUAGE_NAMES.get(fps_name) else {
            continue;
        };
        let Some(&language_id) = language_ids.get(*catalog_name) else {
            continue;
        };
        templates.push(CodeTemplateEntry {
            language_id,
            code: node.text_content(),
        });
    }
    templates
}

/// A special judge is accepted only when declared in C or C++ with a
/// non-empty body; anything else leaves the problem standard-judge.
fn extract_special_judge(item: &Element) -> Option<(String, String)> {
    let spj = item.child("spj")?;
    let language = spj.attr("language")?;
    if language != "C" && language != "C++" {
        return None;
    }
    let code = spj.text_content();
    if code.is_empty() {
        return None;
    }
    Some((language.to_string(), code))
}

fn write_case_file(path: &Path, content: &str) -> Result<(), ImportError> {
    fs::write(path, content).map_err(|e| ImportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
