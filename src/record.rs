//! The normalized records produced by the parser and handed to the
//! persistence layer.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::Language;

/// How submissions against a problem are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgeMode {
    /// Exact-match comparison against the expected output.
    Default,
    /// A special judge program validates the submitted output.
    SpecialJudge,
}

impl JudgeMode {
    /// The wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgeMode::Default => "default",
            JudgeMode::SpecialJudge => "spj",
        }
    }
}

/// Normalized metadata of one imported problem.
///
/// Limits are always normalized to milliseconds and megabytes, whatever unit
/// and schema version the source document used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemRecord {
    /// Problem title, verbatim from the document.
    pub title: String,
    /// Statement text, with image references rewritten to published URLs.
    pub description: String,
    /// Input format description.
    pub input: String,
    /// Output format description.
    pub output: String,
    /// Interleaved samples as `<input>…</input><output>…</output>` markup.
    pub examples: String,
    /// Hint text.
    pub hint: String,
    /// Where the problem comes from.
    pub source: String,
    /// Time limit in milliseconds.
    pub time_limit: u64,
    /// Memory limit in megabytes.
    pub memory_limit: u64,
    /// Display identifier of the importing user.
    pub author: String,
    /// Problem kind; imported problems are always statement problems (0).
    pub problem_type: u32,
    /// Default difficulty assigned to imported problems.
    pub difficulty: u32,
    /// Access level; imported problems are visible only to the uploader.
    pub auth: u32,
    /// Imported problems always carry uploaded test cases.
    pub is_upload_case: bool,
    /// Trailing blanks are stripped from submission output before judging.
    pub is_remove_end_blank: bool,
    /// Per-case verdicts are visible to submitters.
    pub open_case_result: bool,
    /// Whether accepted submissions are shared publicly.
    pub code_share: bool,
    /// Whether the problem is judged on a remote judge.
    pub is_remote: bool,
    /// Whether the problem belongs to a group.
    pub is_group: bool,
    /// Special judge language, only `C` or `C++` when present.
    pub spj_language: Option<String>,
    /// Special judge source code.
    pub spj_code: Option<String>,
}

impl Default for ProblemRecord {
    fn default() -> ProblemRecord {
        ProblemRecord {
            title: String::new(),
            description: String::new(),
            input: String::new(),
            output: String::new(),
            examples: String::new(),
            hint: String::new(),
            source: String::new(),
            time_limit: 0,
            memory_limit: 0,
            author: String::new(),
            problem_type: 0,
            difficulty: 1,
            auth: 1,
            is_upload_case: true,
            is_remove_end_blank: true,
            open_case_result: true,
            code_share: false,
            is_remote: false,
            is_group: false,
            spj_language: None,
            spj_code: None,
        }
    }
}

/// A code template bound to a language of the local catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeTemplateEntry {
    /// Catalog id of the language the template is written in.
    pub language_id: i64,
    /// The template source text.
    pub code: String,
}

/// One materialized test case, referencing files inside the per-problem
/// test-case directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Input file name, relative to the test-case directory (`1.in`, ...).
    pub input: String,
    /// Output file name, relative to the test-case directory (`1.out`, ...).
    pub output: String,
}

/// Everything the persistence layer needs to store one imported problem.
///
/// Built once per surviving item and never mutated afterwards. The
/// referenced test-case directory is owned by the persistence layer from the
/// moment the result is returned: the importer never cleans it up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    /// The normalized problem metadata.
    pub problem: ProblemRecord,
    /// The materialized test cases, in document order.
    pub test_cases: Vec<TestCase>,
    /// Directory holding the test case files of this problem.
    pub testcase_dir: PathBuf,
    /// Snapshot of the language catalog the templates were resolved against.
    pub languages: Vec<Language>,
    /// How the problem is judged.
    pub judge_mode: JudgeMode,
    /// Code templates resolved against the catalog snapshot.
    pub code_templates: Vec<CodeTemplateEntry>,
    /// Always true: the test cases were uploaded, not generated.
    pub uploaded_test_cases: bool,
}
