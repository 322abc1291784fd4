//! OfflineGenerator - canned completions for working without an API key.
//!
//! Picks a template by keyword and answers in the file-marker protocol, so the
//! rest of the pipeline cannot tell it apart from a real backend.

use async_trait::async_trait;
use kiln_core::GenerationError;
use kiln_core::file::FileRecord;
use kiln_core::parser::render_file_blocks;

use crate::generator::{CompletionRequest, TextGenerator};

const TODO_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Todo App</title>
  <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gradient-to-br from-purple-900 via-blue-900 to-indigo-900 min-h-screen p-8">
  <main class="max-w-2xl mx-auto bg-white/10 rounded-2xl shadow-2xl p-8 border border-white/20">
    <h1 class="text-4xl font-bold text-white mb-8 text-center">My Tasks</h1>
    <div class="flex gap-2 mb-6">
      <input id="todoInput" type="text" aria-label="New task" placeholder="What needs to be done?"
        class="flex-1 px-4 py-3 rounded-lg bg-white/10 border border-white/20 text-white placeholder-white/50">
      <button id="addButton" class="px-6 py-3 bg-cyan-500 text-white rounded-lg hover:bg-cyan-600">Add</button>
    </div>
    <ul id="todoList" class="space-y-3"></ul>
  </main>
</body>
</html>"#;

const TODO_JS: &str = r#"let todos = [];

function addTodo() {
  const input = document.getElementById('todoInput');
  const text = input.value.trim();
  if (!text) return;
  todos.push({ id: Date.now(), text, completed: false });
  input.value = '';
  renderTodos();
}

function toggleTodo(id) {
  todos = todos.map(t => (t.id === id ? { ...t, completed: !t.completed } : t));
  renderTodos();
}

function deleteTodo(id) {
  todos = todos.filter(t => t.id !== id);
  renderTodos();
}

function renderTodos() {
  const list = document.getElementById('todoList');
  list.innerHTML = '';
  for (const todo of todos) {
    const item = document.createElement('li');
    item.className = 'flex items-center gap-3 p-4 bg-white/5 rounded-lg border border-white/10';

    const box = document.createElement('input');
    box.type = 'checkbox';
    box.checked = todo.completed;
    box.addEventListener('change', () => toggleTodo(todo.id));

    const label = document.createElement('span');
    label.className = 'flex-1 text-white' + (todo.completed ? ' line-through opacity-50' : '');
    label.textContent = todo.text;

    const remove = document.createElement('button');
    remove.className = 'text-red-400 hover:text-red-300';
    remove.textContent = 'Delete';
    remove.addEventListener('click', () => deleteTodo(todo.id));

    item.append(box, label, remove);
    list.appendChild(item);
  }
}

document.getElementById('addButton').addEventListener('click', addTodo);
document.getElementById('todoInput').addEventListener('keypress', e => {
  if (e.key === 'Enter') addTodo();
});"#;

const CALCULATOR_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Calculator</title>
  <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gradient-to-br from-purple-900 via-blue-900 to-indigo-900 min-h-screen flex items-center justify-center p-8">
  <main class="bg-white/10 rounded-3xl shadow-2xl p-6 border border-white/20 w-full max-w-sm">
    <div id="display" role="status" class="bg-black/30 text-white text-right text-3xl p-6 rounded-xl mb-4">0</div>
    <div id="keys" class="grid grid-cols-4 gap-3 text-white"></div>
  </main>
</body>
</html>"#;

const CALCULATOR_JS: &str = r#"const KEYS = ['C', '⌫', '/', '*', '7', '8', '9', '-', '4', '5', '6', '+', '1', '2', '3', '=', '0', '.'];
let current = '0';

function show() {
  document.getElementById('display').textContent = current;
}

function press(key) {
  if (key === 'C') {
    current = '0';
  } else if (key === '⌫') {
    current = current.slice(0, -1) || '0';
  } else if (key === '=') {
    try {
      if (!/^[0-9+\-*/. ]+$/.test(current)) throw new Error('invalid input');
      current = String(Function('"use strict"; return (' + current + ')')());
    } catch (e) {
      current = 'Error';
    }
  } else {
    current = current === '0' || current === 'Error' ? key : current + key;
  }
  show();
}

const pad = document.getElementById('keys');
for (const key of KEYS) {
  const button = document.createElement('button');
  button.textContent = key;
  button.className = 'p-4 rounded-xl bg-white/10 hover:bg-white/20';
  button.addEventListener('click', () => press(key));
  pad.appendChild(button);
}"#;

const LANDING_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Product Landing</title>
  <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gradient-to-br from-purple-900 via-blue-900 to-indigo-900 text-white">
  <header class="min-h-screen flex items-center justify-center px-8">
    <div class="text-center max-w-4xl">
      <h1 class="text-7xl font-bold mb-6">Launch Your Dreams</h1>
      <p class="text-2xl mb-8 text-white/80">Build amazing products with our platform</p>
      <a href="#features" class="px-8 py-4 bg-cyan-500 rounded-full text-xl hover:scale-105 transition">Get Started Free</a>
    </div>
  </header>
  <section id="features" class="py-20 px-8 bg-black/20">
    <h2 class="text-5xl font-bold text-center mb-16">Why Choose Us</h2>
    <div class="grid md:grid-cols-3 gap-8 max-w-6xl mx-auto">
      <article class="bg-white/10 rounded-2xl p-8 border border-white/20">
        <h3 class="text-2xl font-bold mb-3">Lightning Fast</h3>
        <p class="text-white/70">Experience blazing speed and performance</p>
      </article>
      <article class="bg-white/10 rounded-2xl p-8 border border-white/20">
        <h3 class="text-2xl font-bold mb-3">Beautiful Design</h3>
        <p class="text-white/70">Interfaces that users love</p>
      </article>
      <article class="bg-white/10 rounded-2xl p-8 border border-white/20">
        <h3 class="text-2xl font-bold mb-3">Secure</h3>
        <p class="text-white/70">Security built in from day one</p>
      </article>
    </div>
  </section>
  <footer class="py-20 px-8 text-center">
    <h2 class="text-5xl font-bold mb-6">Ready to Start?</h2>
    <a href="#" class="px-8 py-4 bg-white text-purple-900 rounded-full text-xl">Start Building Now</a>
  </footer>
</body>
</html>"##;

const DEFAULT_JS: &str = r#"console.log('App loaded!');

document.querySelector('button')?.addEventListener('click', () => {
  alert('Button clicked!');
});"#;

/// Template-backed generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Canned reply for a user request.
    pub fn respond(&self, request: &str) -> String {
        let lower = request.to_lowercase();
        let (message, files) = if lower.contains("todo") || lower.contains("task") {
            (
                "I've created a todo app with Tailwind CSS! You can add, complete, and delete tasks. Try it out in the preview!".to_string(),
                vec![
                    FileRecord::inferred("index.html", TODO_HTML),
                    FileRecord::inferred("script.js", TODO_JS),
                ],
            )
        } else if lower.contains("calculator") || lower.contains("calc") {
            (
                "Here's a functional calculator with a modern design! It supports basic arithmetic operations.".to_string(),
                vec![
                    FileRecord::inferred("index.html", CALCULATOR_HTML),
                    FileRecord::inferred("script.js", CALCULATOR_JS),
                ],
            )
        } else if lower.contains("landing") || lower.contains("website") || lower.contains("homepage")
        {
            (
                "I've created a landing page with a hero section, features, and a call-to-action. Feel free to customize it!".to_string(),
                vec![FileRecord::inferred("index.html", LANDING_HTML)],
            )
        } else {
            (
                format!(
                    "I understand you want to build: \"{}\". Here's a starting template you can modify.",
                    request.trim()
                ),
                vec![
                    FileRecord::inferred("index.html", default_html(request.trim())),
                    FileRecord::inferred("script.js", DEFAULT_JS),
                ],
            )
        };
        format!("{message}\n\n{}", render_file_blocks(&files))
    }
}

fn default_html(request: &str) -> String {
    let escaped = request
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Custom App</title>
  <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gradient-to-br from-purple-900 via-blue-900 to-indigo-900 min-h-screen p-8">
  <main class="max-w-4xl mx-auto bg-white/10 rounded-2xl shadow-2xl p-8 border border-white/20 text-center">
    <h1 class="text-5xl font-bold text-white mb-4">Your Custom App</h1>
    <p class="text-xl text-white/80 mb-6">Request: {escaped}</p>
    <p class="text-white/60">Edit the code to customize your application!</p>
    <button class="mt-6 px-6 py-3 bg-cyan-500 text-white rounded-lg hover:bg-cyan-600">Get Started</button>
  </main>
</body>
</html>"#
    )
}

#[async_trait]
impl TextGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let subject = request.user_input.as_deref().unwrap_or(&request.prompt);
        Ok(self.respond(subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::parser::parse_response;

    #[test]
    fn test_keyword_templates() {
        let todo = parse_response(&OfflineGenerator.respond("Build a TODO list"));
        assert_eq!(todo.files.len(), 2);
        assert!(todo.message.contains("todo app"));

        let calc = parse_response(&OfflineGenerator.respond("simple calculator"));
        assert!(calc.files[1].content.contains("press(key)"));

        let landing = parse_response(&OfflineGenerator.respond("a landing page"));
        assert_eq!(landing.files.len(), 1);
    }

    #[test]
    fn test_default_template_escapes_request() {
        let parsed = parse_response(&OfflineGenerator.respond("a <blink> thing"));
        assert!(parsed.files[0].content.contains("a &lt;blink&gt; thing"));
        assert!(parsed.message.contains("a <blink> thing"));
    }

    #[tokio::test]
    async fn test_prefers_user_input_over_prompt() {
        let request = CompletionRequest::new(
            "system text mentioning a website and tasks",
            Default::default(),
        )
        .with_user_input("calculator please");

        let raw = OfflineGenerator.complete(request).await.unwrap();
        assert!(raw.starts_with("Here's a functional calculator"));
    }
}
