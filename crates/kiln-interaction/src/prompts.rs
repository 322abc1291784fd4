//! Prompt templates.

use kiln_core::GenerationError;
use kiln_core::message::ConversationTurn;
use minijinja::{Environment, context};
use std::fmt;

const SYSTEM_TEMPLATE: &str = r#"You are an expert web developer AI assistant. Your role is to help users build web applications by generating complete, working code.

IMPORTANT INSTRUCTIONS:
1. When generating code, ALWAYS wrap each file in special markers:
   ### FILE: filename.ext
   ```language
   [code here]
   ```

2. Generate COMPLETE, PRODUCTION-READY code - no placeholders or "// rest of code" comments
3. For web apps, always include:
   - index.html (with Tailwind CSS CDN)
   - script.js (if needed)
   - styles.css (if custom styles needed)

4. Make apps beautiful with Tailwind CSS
5. Make apps fully functional with proper JavaScript
6. Include error handling in your code
7. Test edge cases mentally before generating

EXAMPLE RESPONSE FORMAT:
I'll create a [description] for you!

### FILE: index.html
```html
<!DOCTYPE html>
<html>
...complete code...
</html>
```

### FILE: script.js
```javascript
// Complete working code
```

Now respond to the user's request following this format."#;

const THINK_TEMPLATE: &str = r###"DEEP REASONING MODE:
Before writing any code, think the problem through. Start your reply with a section headed "## Thinking" that covers:
- What the user actually needs, including implicit requirements
- The data model and state transitions
- Edge cases and failure modes
- How the files will be split and why
Then give the files in the format above."###;

const CHAT_TEMPLATE: &str = r#"{{ system }}
{% if think %}

{{ think_block }}
{% endif %}

Previous conversation:
{% for turn in history %}
{{ turn.role }}: {{ turn.content }}
{% endfor %}

User: {{ prompt }}

Assistant:"#;

const FIX_TEMPLATE: &str = r#"There's an error in the code. Please fix it.

ERROR: {{ error }}

CURRENT FILES:
{{ files }}

Please provide the COMPLETE fixed code for all files that need changes. Use the same ### FILE: format."#;

const AGENT_TEMPLATE: &str = r#"You are {{ role }} (AI #{{ id }}) in team {{ team }}.

{{ context }}

Your specific task:
{{ task }}

CRITICAL RULES:
- Generate ONLY production-ready, executable code
- NO placeholders, NO TODOs, NO "implement this later"
- Include complete error handling
- Add input validation
- Ensure accessibility and responsiveness
- Output ONLY code with file markers like: ### FILE: filename.ext

Generate the complete solution now:"#;

/// Renders every prompt Kiln sends.
pub struct PromptManager {
    env: Environment<'static>,
}

impl fmt::Debug for PromptManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptManager").finish()
    }
}

impl Default for PromptManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptManager {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for (name, source) in [
            ("chat.txt", CHAT_TEMPLATE),
            ("fix.txt", FIX_TEMPLATE),
            ("agent.txt", AGENT_TEMPLATE),
        ] {
            env.add_template(name, source)
                .expect("built-in template is valid");
        }
        Self { env }
    }

    /// System instructions, optional reasoning block, recent history and the
    /// new user turn.
    pub fn render_chat(
        &self,
        prompt: &str,
        history: &[ConversationTurn],
        think: bool,
    ) -> Result<String, GenerationError> {
        self.render(
            "chat.txt",
            context! {
                system => SYSTEM_TEMPLATE,
                think_block => THINK_TEMPLATE,
                think => think,
                history => history,
                prompt => prompt,
            },
        )
    }

    /// Diagnose-and-patch request. `files` is already in file-marker form.
    pub fn render_fix(&self, error: &str, files: &str) -> Result<String, GenerationError> {
        self.render("fix.txt", context! { error => error, files => files })
    }

    /// Role prompt for one orchestration agent.
    pub fn render_agent(
        &self,
        id: u8,
        role: &str,
        team: &str,
        context: &str,
        task: &str,
    ) -> Result<String, GenerationError> {
        self.render(
            "agent.txt",
            context! {
                id => id,
                role => role,
                team => team,
                context => context,
                task => task,
            },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, GenerationError> {
        self.env
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|err| GenerationError::Prompt(format!("{name}: {err}")))
    }
}
