//! Completion parser for the file-marker protocol.
//!
//! Models are asked to emit every file as
//!
//! ````text
//! ### FILE: index.html
//! ```html
//! <!DOCTYPE html>...
//! ```
//! ````
//!
//! Prose before, between or after the blocks becomes the assistant message.
//! Model output is uncontrolled, so the parser is tolerant: when no marker is
//! present it falls back to bare fenced blocks, and malformed fences are
//! skipped instead of reported.

use regex::Regex;
use std::sync::LazyLock;

use crate::file::{FileRecord, FileSet, Language};

/// Shown when a completion consists of nothing but file blocks.
pub const DEFAULT_MESSAGE: &str = "I've generated the code for you!";

static FILE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"### FILE:[ \t]*([^\n]+)\r?\n```([\w+#.-]*)[ \t]*\r?\n([\s\S]*?)```")
        .expect("file block pattern is valid")
});

static BARE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```([\w+#.-]*)[ \t]*\r?\n([\s\S]*?)```").expect("fence pattern is valid")
});

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern is valid"));

/// Files and message extracted from one completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub files: Vec<FileRecord>,
    pub message: String,
}

/// Parses a raw completion into files plus the human-readable remainder.
pub fn parse_response(raw: &str) -> ParsedResponse {
    ParsedResponse {
        files: extract_files(raw),
        message: extract_message(raw),
    }
}

/// Extracts file records, trying marker-tagged blocks first.
pub fn extract_files(raw: &str) -> Vec<FileRecord> {
    let tagged = extract_tagged_files(raw);
    if !tagged.is_empty() {
        return tagged;
    }
    extract_bare_blocks(raw)
}

fn extract_tagged_files(raw: &str) -> Vec<FileRecord> {
    FILE_BLOCK
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = clean_file_name(&caps[1]);
            if name.is_empty() {
                return None;
            }
            let tag = &caps[2];
            let language = if tag.is_empty() {
                Language::from_file_name(&name)
            } else {
                Language::from_tag(tag)
            };
            Some(FileRecord::new(name, language, caps[3].trim()))
        })
        .collect()
}

/// Names bare fenced blocks by language.
///
/// Several blocks of the same language map to the same name, so later blocks
/// overwrite earlier ones. That loss is accepted.
fn extract_bare_blocks(raw: &str) -> Vec<FileRecord> {
    let mut files = FileSet::new();
    for (index, caps) in BARE_FENCE.captures_iter(raw).enumerate() {
        let content = caps[2].trim();
        let (name, language) = if looks_like_html_document(content) {
            ("index.html".to_string(), Language::Html)
        } else {
            fallback_name(&caps[1], index)
        };
        files.upsert(FileRecord::new(name, language, content));
    }
    files.into_vec()
}

fn fallback_name(tag: &str, index: usize) -> (String, Language) {
    let language = Language::from_tag(tag);
    let name = match &language {
        Language::Html => "index.html".to_string(),
        Language::JavaScript => "script.js".to_string(),
        Language::Css => "styles.css".to_string(),
        Language::Json => "data.json".to_string(),
        Language::TypeScript => "script.ts".to_string(),
        Language::Other(other) if other.is_empty() => format!("snippet-{}.txt", index + 1),
        Language::Other(other) => format!("snippet-{}.{}", index + 1, other),
    };
    let language = match language {
        Language::Other(other) if other.is_empty() => Language::Other("plaintext".to_string()),
        language => language,
    };
    (name, language)
}

fn looks_like_html_document(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains("<!doctype html") || lower.contains("<html")
}

fn clean_file_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '`' || c == '*' || c.is_whitespace())
        .to_string()
}

/// Strips file blocks and normalizes whitespace.
pub fn extract_message(raw: &str) -> String {
    let stripped = FILE_BLOCK.replace_all(raw, "");
    let collapsed = EXCESS_NEWLINES.replace_all(stripped.trim(), "\n\n");
    let message = collapsed.trim();
    if message.is_empty() {
        DEFAULT_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

/// Parses an orchestrated build's final text into its deliverable files.
///
/// When nothing parses, the whole text becomes a single `index.html`.
pub fn parse_deliverable(raw: &str) -> Vec<FileRecord> {
    let files = extract_files(raw);
    if files.is_empty() {
        vec![FileRecord::new("index.html", Language::Html, raw)]
    } else {
        files
    }
}

/// Serializes files back into the file-marker protocol.
pub fn render_file_blocks<'a>(files: impl IntoIterator<Item = &'a FileRecord>) -> String {
    files
        .into_iter()
        .map(|f| format!("### FILE: {}\n```{}\n{}\n```", f.name, f.language, f.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
