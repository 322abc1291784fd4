//! Lightweight code-quality heuristics over the current files.
//!
//! These are substring checks, not analysis. They produce hints for the user,
//! never errors.

use serde::{Deserialize, Serialize};

use crate::file::FileRecord;

const SEMANTIC_TAGS: [&str; 6] = ["header", "nav", "main", "section", "article", "footer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Success,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub kind: CheckKind,
    pub message: String,
}

impl QualityCheck {
    fn new(kind: CheckKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

/// Runs every heuristic. An empty result means nothing worth reporting.
pub fn analyze(files: &[FileRecord]) -> Vec<QualityCheck> {
    let html = files.iter().find(|f| f.name.ends_with(".html"));
    let js = files.iter().find(|f| f.name.ends_with(".js"));
    let mut checks = Vec::new();

    if let Some(html) = html {
        let content = html.content.as_str();
        if content.contains("tailwindcss.com") {
            checks.push(QualityCheck::new(CheckKind::Success, "Using Tailwind CSS for styling"));
        }
        if content.contains("aria-") || content.contains("role=") {
            checks.push(QualityCheck::new(CheckKind::Success, "Accessibility attributes found"));
        } else {
            checks.push(QualityCheck::new(
                CheckKind::Warning,
                "Consider adding ARIA labels for accessibility",
            ));
        }
    }

    if let Some(js) = js {
        if js.content.contains("try") && js.content.contains("catch") {
            checks.push(QualityCheck::new(CheckKind::Success, "Error handling implemented"));
        } else {
            checks.push(QualityCheck::new(
                CheckKind::Info,
                "Consider adding error handling with try-catch",
            ));
        }
    }

    if let Some(html) = html {
        let content = html.content.as_str();
        if content.contains("viewport") || content.contains("responsive") {
            checks.push(QualityCheck::new(CheckKind::Success, "Responsive design meta tag found"));
        }
        if SEMANTIC_TAGS
            .iter()
            .any(|tag| content.contains(&format!("<{tag}")))
        {
            checks.push(QualityCheck::new(CheckKind::Success, "Using semantic HTML elements"));
        }
    }

    if let Some(js) = js
        && (js.content.contains("debounce") || js.content.contains("throttle"))
    {
        checks.push(QualityCheck::new(CheckKind::Success, "Performance optimization detected"));
    }

    checks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_files_no_checks() {
        assert!(analyze(&[]).is_empty());
    }

    #[test]
    fn test_html_without_aria_warns() {
        let files = [FileRecord::inferred(
            "index.html",
            r#"<meta name="viewport"><main></main>"#,
        )];
        let checks = analyze(&files);

        assert!(checks.iter().any(|c| c.kind == CheckKind::Warning));
        assert!(checks.iter().any(|c| c.message.contains("semantic")));
        assert!(checks.iter().any(|c| c.message.contains("Responsive")));
    }

    #[test]
    fn test_js_checks() {
        let files = [FileRecord::inferred(
            "script.js",
            "try { go() } catch (e) {} const f = debounce(go);",
        )];
        let checks = analyze(&files);

        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|c| c.kind == CheckKind::Success));
    }
}
