//! Project export/import format.
//!
//! A project file is a JSON array of `{name, content}` objects. Languages are
//! not stored; they are re-inferred from file names on import.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::file::FileRecord;

/// Default file name used by export when no path is given.
pub const DEFAULT_EXPORT_FILE: &str = "kiln-project.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ExportedFile {
    name: String,
    content: String,
}

/// Serializes files into the export format.
pub fn export_files(files: &[FileRecord]) -> Result<String> {
    let exported: Vec<ExportedFile> = files
        .iter()
        .map(|f| ExportedFile {
            name: f.name.clone(),
            content: f.content.clone(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&exported)?)
}

/// Parses the export format. Blank names are rejected.
pub fn import_files(json: &str) -> Result<Vec<FileRecord>> {
    let exported: Vec<ExportedFile> = serde_json::from_str(json)?;
    exported
        .into_iter()
        .map(|f| FileRecord::new_validated(&f.name, f.content))
        .collect()
}

pub fn save_project(path: &Path, files: &[FileRecord]) -> Result<()> {
    let json = export_files(files)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    tracing::debug!("[Export] Wrote {} files to {}", files.len(), path.display());
    Ok(())
}

pub fn load_project(path: &Path) -> Result<Vec<FileRecord>> {
    let json = std::fs::read_to_string(path)?;
    import_files(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KilnError;
    use crate::file::Language;

    #[test]
    fn test_export_drops_language() {
        let json = export_files(&[FileRecord::new("app.js", Language::JavaScript, "go();")])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "app.js");
        assert_eq!(value[0]["content"], "go();");
        assert!(value[0].get("language").is_none());
    }

    #[test]
    fn test_import_infers_language() {
        let files =
            import_files(r#"[{"name":"index.html","content":"<p>"},{"name":"a.css","content":""}]"#)
                .unwrap();
        assert_eq!(files[0].language, Language::Html);
        assert_eq!(files[1].language, Language::Css);
    }

    #[test]
    fn test_import_rejects_blank_names() {
        let err = import_files(r#"[{"name":" ","content":""}]"#).unwrap_err();
        assert!(matches!(err, KilnError::InvalidFileName(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_EXPORT_FILE);
        let files = vec![FileRecord::inferred("index.html", "<h1>hi</h1>")];

        save_project(&path, &files).unwrap();
        assert_eq!(load_project(&path).unwrap(), files);
    }
}
