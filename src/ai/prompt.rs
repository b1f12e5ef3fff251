//! Instructions sent to every provider.

pub const SYSTEM_INSTRUCTION: &str = concat!(
    "You are an assistant that outputs a single JSON object with exactly three keys: ",
    "\"component_code\", \"html_snippet\", \"explanation\". ",
    "component_code must be a self-contained React functional component (export default) as a string; ",
    "it must not load external assets and should render something visual or animated about the topic. ",
    "html_snippet must be a small standalone HTML fragment that can be injected directly into a page. ",
    "explanation must be plain text describing the concept. ",
    "Do not include backticks in any value. Output only JSON."
);

/// User turn built from the topic and optional style guidance.
pub fn user_instruction(prompt: &str, style_guidance: &str) -> String {
    let mut out = format!(
        "Topic: {prompt}\n\
         Produce a dynamic, visual, learning-oriented React functional component (no external assets) \
         that visualizes the topic, preferably a GIF-like animation or a small interactive flow."
    );
    let style = style_guidance.trim();
    if !style.is_empty() {
        out.push('\n');
        out.push_str(style);
    }
    out.push_str(
        "\nKeep the component self-contained and comment where images or GIFs could be placed. \
         Also provide a plain html_snippet.",
    );
    out
}
