//! Project file types.
//!
//! A project is a small set of named source files. Names are unique keys and
//! their extension drives language inference when no explicit tag is known.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KilnError, Result};

/// Language tag attached to a project file.
///
/// Serialized as a lowercase tag. Unknown tags are carried verbatim in
/// [`Language::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    Html,
    Css,
    JavaScript,
    TypeScript,
    Json,
    Other(String),
}

impl Language {
    /// Parses a fence tag. Case-folded; `js` is the only short alias.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        match tag.as_str() {
            "html" => Self::Html,
            "css" => Self::Css,
            "javascript" | "js" => Self::JavaScript,
            "typescript" => Self::TypeScript,
            "json" => Self::Json,
            _ => Self::Other(tag),
        }
    }

    /// Infers the language from the final `.ext` segment of a file name.
    pub fn from_file_name(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => Self::from_tag(ext),
            _ => Self::Other("plaintext".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Json => "json",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Language {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.as_str().to_string()
    }
}

/// One named unit of generated or edited source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique key within the project (e.g. `index.html`).
    pub name: String,
    /// Language tag used for highlighting and preview composition.
    pub language: Language,
    /// File content, exactly as it should be written to disk.
    pub content: String,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, language: Language, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language,
            content: content.into(),
        }
    }

    /// Creates a record whose language is inferred from the file name.
    pub fn inferred(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let language = Language::from_file_name(&name);
        Self::new(name, language, content)
    }

    /// Creates a record for user-initiated file creation.
    ///
    /// Blank names are rejected; the name is trimmed.
    pub fn new_validated(name: &str, content: impl Into<String>) -> Result<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(KilnError::InvalidFileName(name.to_string()));
        }
        Ok(Self::inferred(trimmed, content))
    }
}

/// Insertion-ordered set of files keyed by name.
///
/// Iteration order is the tab order. Writing a name that already exists
/// replaces the stored record (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSet {
    records: Vec<FileRecord>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from records in order; duplicate names keep the first
    /// position and the last content.
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.upsert(record);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.records.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn first(&self) -> Option<&FileRecord> {
        self.records.first()
    }

    /// Returns the first file tagged with `language`.
    pub fn first_of(&self, language: &Language) -> Option<&FileRecord> {
        self.records.iter().find(|f| &f.language == language)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|f| f.name.as_str())
    }

    /// Inserts or replaces in place.
    pub fn upsert(&mut self, record: FileRecord) {
        match self.records.iter_mut().find(|f| f.name == record.name) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Removes any file with the same name, then appends.
    pub fn push_back(&mut self, record: FileRecord) {
        self.records.retain(|f| f.name != record.name);
        self.records.push(record);
    }

    /// Replaces one file's content. Returns false when no such file exists.
    pub fn update_content(&mut self, name: &str, content: impl Into<String>) -> bool {
        match self.records.iter_mut().find(|f| f.name == name) {
            Some(file) => {
                file.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn to_vec(&self) -> Vec<FileRecord> {
        self.records.clone()
    }

    pub fn into_vec(self) -> Vec<FileRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<FileRecord> for FileSet {
    fn from_iter<T: IntoIterator<Item = FileRecord>>(iter: T) -> Self {
        Self::from_records(iter)
    }
}
