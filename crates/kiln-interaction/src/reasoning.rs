//! Extraction of the reasoning section from think-mode completions.

use regex::Regex;
use std::sync::LazyLock;

/// Sections shorter than this are headings without substance.
const MIN_REASONING_CHARS: usize = 40;

/// `## Thinking`, `**Analysis**`, `### My Approach:` and similar standalone
/// headings.
static MARKDOWN_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:#{1,6}\s*(?:\*\*)?|\*\*)\s*(?:\w+\s+)?(thinking|reasoning|analysis|approach|plan)\b[^\n]*$",
    )
    .expect("heading pattern is valid")
});

/// `Reasoning: ...` with the section starting on the same line.
static COLON_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(thinking|reasoning|analysis|approach|plan)\s*:\s*(.*)$")
        .expect("colon heading pattern is valid")
});

/// Any line that closes a section.
static SECTION_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#|```|\*\*[^*]+\*\*:?\s*$)").expect("section break pattern is valid")
});

/// Returns the first reasoning section longer than 40 characters.
pub fn extract_reasoning(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];
        let first_line = if MARKDOWN_HEADING.is_match(line) {
            Some(String::new())
        } else {
            COLON_HEADING
                .captures(line)
                .map(|caps| caps[2].trim().to_string())
        };

        let Some(first_line) = first_line else {
            index += 1;
            continue;
        };

        let mut body = vec![first_line];
        let mut cursor = index + 1;
        while cursor < lines.len() && !is_section_start(lines[cursor]) {
            body.push(lines[cursor].to_string());
            cursor += 1;
        }

        let section = body.join("\n").trim().to_string();
        if section.chars().count() > MIN_REASONING_CHARS {
            return Some(section);
        }
        index = cursor;
    }

    None
}

fn is_section_start(line: &str) -> bool {
    SECTION_BREAK.is_match(line) || COLON_HEADING.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "The user wants a todo list that persists across reloads, so localStorage is needed.";

    #[test]
    fn test_markdown_heading() {
        let text = format!("## Thinking\n{LONG}\n\n### FILE: index.html\n```html\n<p>\n```");
        assert_eq!(extract_reasoning(&text).as_deref(), Some(LONG));
    }

    #[test]
    fn test_bold_heading_with_prefix() {
        let text = format!("**My Approach**\n{LONG}\n**Files**\nnothing");
        assert_eq!(extract_reasoning(&text).as_deref(), Some(LONG));
    }

    #[test]
    fn test_colon_form() {
        let text = format!("Reasoning: {LONG}\n\n```html\n<p>\n```");
        assert_eq!(extract_reasoning(&text).as_deref(), Some(LONG));
    }

    #[test]
    fn test_short_sections_are_skipped() {
        let text = format!("Plan: keep it simple\n\n## Analysis\n{LONG}");
        assert_eq!(extract_reasoning(&text).as_deref(), Some(LONG));
    }

    #[test]
    fn test_absent_reasoning() {
        assert!(extract_reasoning("I'll build it!\n\n### FILE: a.js\n```js\nx\n```").is_none());
        assert!(extract_reasoning("").is_none());
    }
}
