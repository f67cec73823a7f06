//! The language catalog collaborator and the fixed mapping from FPS template
//! language names to the catalog names used locally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The implementation tag of the languages judged locally. The catalog is
/// always queried with this tag: remotely judged languages can never back a
/// code template.
pub const LOCAL_LANGUAGE_TAG: &str = "ME";

/// One entry of the language catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Catalog id, referenced by [`crate::CodeTemplateEntry`].
    pub id: i64,
    /// Display name, matched against the FPS mapping table.
    pub name: String,
}

/// The live language catalog, queried once per parsed document.
pub trait LanguageCatalog {
    /// List the languages sharing the given implementation tag.
    fn list_languages(&self, tag: &str) -> anyhow::Result<Vec<Language>>;
}

lazy_static! {
    /// FPS template language names mapped to the catalog names used locally.
    /// Template languages absent from this table are dropped.
    pub(crate) static ref FPS_LANGUAGE_NAMES: HashMap<&'static str, &'static str> = {
        let mut names = HashMap::new();
        names.insert("Python", "Python3");
        names.insert("Go", "Golang");
        names.insert("C", "C");
        names.insert("C++", "C++");
        names.insert("Java", "Java");
        names.insert("C#", "C#");
        names
    };
}
