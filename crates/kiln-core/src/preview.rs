//! Preview document composition.
//!
//! Turns the project's files into one self-contained HTML document that a
//! sandboxed frame can load directly, and decodes the error payloads that the
//! injected bridge posts back to the host.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use crate::build::Platform;
use crate::file::{FileRecord, FileSet, Language};

/// Shown when the project has no HTML file yet.
pub const PLACEHOLDER_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Preview</title>
</head>
<body style="font-family: system-ui, sans-serif; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; color: #555;">
  <p>No HTML file yet. Ask the assistant to generate one.</p>
</body>
</html>"#;

/// Sandbox permissions for the preview frame: scripts and same-origin
/// document access, nothing else.
pub const SANDBOX_ATTRIBUTES: &str = "allow-scripts allow-same-origin";

const ERROR_BRIDGE_PRELUDE: &str = r#"
window.addEventListener('error', function(e) {
  window.parent.postMessage({ type: 'error', message: e.message, stack: e.error && e.error.stack }, '*');
});
window.addEventListener('unhandledrejection', function(e) {
  window.parent.postMessage({ type: 'error', message: String(e.reason), stack: e.reason && e.reason.stack }, '*');
});
try {
"#;

const ERROR_BRIDGE_EPILOGUE: &str = r#"
} catch (e) {
  window.parent.postMessage({ type: 'error', message: e.message, stack: e.stack }, '*');
}
"#;

static SCRIPT_OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<script\b([^>]*)>").expect("script pattern is valid"));

static STYLE_OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<style\b").expect("style pattern is valid"));

static SRC_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsrc\s*=").expect("src pattern is valid"));

/// Builds the document the preview frame loads.
pub fn compose_document(files: &FileSet) -> String {
    let mut html = find_file(files, "index.html", &Language::Html)
        .map(|f| f.content.clone())
        .unwrap_or_else(|| PLACEHOLDER_HTML.to_string());

    if let Some(css) = find_file(files, "styles.css", &Language::Css)
        && !STYLE_OPEN_TAG.is_match(&html)
    {
        let tag = format!("<style>{}</style>", css.content);
        html = insert_before_close(&html, "</head>", &tag, Missing::Prepend);
    }

    if let Some(js) = find_file(files, "script.js", &Language::JavaScript)
        && !has_inline_script(&html)
    {
        let tag = format!("<script>{}</script>", wrap_with_error_bridge(&js.content));
        html = insert_before_close(&html, "</body>", &tag, Missing::Append);
    }

    html
}

/// Prefers the conventional name, then the first file of the language.
fn find_file<'a>(files: &'a FileSet, name: &str, language: &Language) -> Option<&'a FileRecord> {
    files.get(name).or_else(|| files.first_of(language))
}

/// True when the document already carries a `<script>` without `src`.
fn has_inline_script(html: &str) -> bool {
    SCRIPT_OPEN_TAG
        .captures_iter(html)
        .any(|caps| !SRC_ATTRIBUTE.is_match(&caps[1]))
}

/// Wraps user code so every failure is posted to the host page.
pub fn wrap_with_error_bridge(code: &str) -> String {
    let code = code.replace("</script", "<\\/script");
    format!("{ERROR_BRIDGE_PRELUDE}{code}{ERROR_BRIDGE_EPILOGUE}")
}

enum Missing {
    Prepend,
    Append,
}

fn insert_before_close(html: &str, close_tag: &str, insertion: &str, missing: Missing) -> String {
    let lower = html.to_ascii_lowercase();
    let position = match missing {
        Missing::Prepend => lower.find(close_tag),
        Missing::Append => lower.rfind(close_tag),
    };
    match (position, missing) {
        (Some(idx), _) => format!("{}{}{}", &html[..idx], insertion, &html[idx..]),
        (None, Missing::Prepend) => format!("{insertion}{html}"),
        (None, Missing::Append) => format!("{html}{insertion}"),
    }
}

/// Wraps a composed document in a host page that frames it in a sandboxed
/// iframe sized for `mode` and lists the errors the bridge reports.
pub fn host_page(document: &str, mode: ViewMode) -> String {
    let srcdoc = document.replace('&', "&amp;").replace('"', "&quot;");
    let size = match mode.viewport() {
        Some(Viewport { width, height }) => format!("width: {width}px; height: {height}px;"),
        None => "width: 100%; height: 100%;".to_string(),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Kiln Preview ({label})</title>
<style>
html, body {{ margin: 0; height: 100%; background: #111827; }}
#frame {{ {size} border: 0; background: #fff; display: block; margin: 0 auto; }}
#errors {{ position: fixed; bottom: 0; left: 0; right: 0; margin: 0; max-height: 30%; overflow: auto; color: #fca5a5; background: rgba(0,0,0,.85); font: 12px monospace; }}
</style>
</head>
<body>
<iframe id="frame" sandbox="{sandbox}" srcdoc="{srcdoc}"></iframe>
<pre id="errors"></pre>
<script>
window.addEventListener('message', function(e) {{
  if (e.data && e.data.type === 'error') {{
    document.getElementById('errors').textContent += e.data.message + '\n' + (e.data.stack || '') + '\n';
  }}
}});
</script>
</body>
</html>"#,
        label = mode.label(),
        sandbox = SANDBOX_ATTRIBUTES,
    )
}

/// A runtime error reported by the preview frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeError {
    pub message: String,
    pub stack: Option<String>,
}

impl RuntimeError {
    /// Text stored as the project's last runtime error.
    pub fn to_error_text(&self) -> String {
        match self.stack.as_deref().map(str::trim) {
            Some(stack) if !stack.is_empty() => format!("{}\n{}", self.message, stack),
            _ => self.message.clone(),
        }
    }
}

/// Messages the host accepts from the preview frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewMessage {
    Error(RuntimeError),
}

impl PreviewMessage {
    /// Decodes a posted payload. Anything other than
    /// `{type: 'error', message, stack?}` is ignored.
    pub fn from_json(payload: &Value) -> Option<Self> {
        let object = payload.as_object()?;
        if object.get("type")?.as_str()? != "error" {
            return None;
        }
        let message = match object.get("message")? {
            Value::String(text) => text.clone(),
            Value::Null => return None,
            other => other.to_string(),
        };
        let stack = object
            .get("stack")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self::Error(RuntimeError { message, stack }))
    }
}

/// Pixel dimensions of an emulated screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// How the preview is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Fill the container.
    #[default]
    Desktop,
    /// Fixed phone-sized viewport.
    Mobile,
    /// Device-skinned emulator for one platform.
    Device(Platform),
}

impl ViewMode {
    /// Fixed viewport, or `None` when the preview fills its container.
    pub fn viewport(self) -> Option<Viewport> {
        match self {
            Self::Desktop | Self::Device(Platform::Web) => None,
            Self::Mobile => Some(Viewport {
                width: 375,
                height: 667,
            }),
            Self::Device(Platform::Android) => Some(Viewport {
                width: 360,
                height: 640,
            }),
            Self::Device(Platform::Ios) => Some(Viewport {
                width: 390,
                height: 844,
            }),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Desktop => "Desktop",
            Self::Mobile => "Mobile",
            Self::Device(Platform::Web) => "Web Browser",
            Self::Device(Platform::Android) => "Android Device",
            Self::Device(Platform::Ios) => "iPhone 14",
        }
    }
}
