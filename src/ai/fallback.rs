use serde::Deserialize;

use super::{ProviderKind, VisualizationResult};

const EXCERPT_CHARS: usize = 500;

#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    component_code: Option<String>,
    #[serde(default)]
    html_snippet: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

/// Drop a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse provider text into a result. All three keys must be present and non-blank.
pub fn parse_result(raw: &str) -> Option<VisualizationResult> {
    let parsed: RawResult = serde_json::from_str(strip_code_fence(raw)).ok()?;
    let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    Some(VisualizationResult {
        component_code: non_blank(parsed.component_code)?,
        html_snippet: non_blank(parsed.html_snippet)?,
        explanation: non_blank(parsed.explanation)?,
    })
}

/// First few hundred characters, safe to embed in a `/* */` comment.
fn excerpt(text: &str) -> String {
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    let cut = cut.replace("*/", "* /");
    if cut.trim().is_empty() {
        "(empty response)".into()
    } else {
        cut
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn placeholder_html(prompt: &str) -> String {
    format!(
        "<div>{} visualization could not be generated</div>",
        escape_html(prompt)
    )
}

/// Result for a response that arrived but was not the JSON we asked for.
pub fn unparseable(provider: ProviderKind, prompt: &str, raw: &str) -> VisualizationResult {
    VisualizationResult {
        component_code: format!(
            "// failed to parse AI response from {provider}\n/* {} */",
            excerpt(raw)
        ),
        html_snippet: placeholder_html(prompt),
        explanation: format!(
            "{} did not return valid structured output; the raw response is included in component_code as a comment.",
            provider.display_name()
        ),
    }
}

/// Result for a request that failed before any usable text came back.
pub fn upstream_failure(provider: ProviderKind, prompt: &str, reason: &str) -> VisualizationResult {
    VisualizationResult {
        component_code: format!(
            "// AI request to {provider} failed\n/* {} */",
            excerpt(reason)
        ),
        html_snippet: placeholder_html(prompt),
        explanation: format!(
            "{} did not return valid structured output ({}).",
            provider.display_name(),
            excerpt(reason)
        ),
    }
}
