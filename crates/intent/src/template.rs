//! Extraction prompt rendering.

use minijinja::{Environment, context};

use crate::error::IntentError;
use crate::intent::Intent;

/// Fuel limit for prompt rendering.
const FUEL_LIMIT: u64 = 50_000;

const PROMPT_TEMPLATE: &str = r#"# Task: {{ title }}

# Recent Messages:
{{ recent_messages }}

# Instructions:
Extract the following fields from the user's last message:
{% for f in fields -%}
- {{ f.name }}: {{ f.description }}
{% endfor %}
{%- if examples %}
# Examples
{% for ex in examples -%}
User: {{ ex.user }}
Assistant: {{ ex.assistant }}

{% endfor %}
{%- endif %}
Respond with a JSON object containing exactly these keys: {{ fields | map(attribute="name") | join(", ") }}.
Use null for values the user did not give.
Your response should include the valid JSON block and nothing else.
"#;

/// Render the extraction prompt for `intent` given the recent conversation.
pub fn render_prompt(intent: Intent, recent_messages: &str) -> Result<String, IntentError> {
    let mut env = Environment::new();
    env.set_fuel(Some(FUEL_LIMIT));
    env.render_str(
        PROMPT_TEMPLATE,
        context! {
            title => intent.title(),
            recent_messages => recent_messages,
            fields => intent.fields(),
            examples => intent.examples(),
        },
    )
    .map_err(|e| IntentError::Template(format!("rendering {intent}: {e}")))
}
