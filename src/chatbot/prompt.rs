//! Prompt template sent to the model.
//!
//! The section headers are parsed back out of the reply by `format`, so the
//! template must stay in sync with `format::CORRECTED_MARKER`.

use crate::chatbot::mode::Mode;

/// Build the instruction for one analysis request.
///
/// User text is embedded verbatim, without escaping or delimiting.
pub fn build_prompt(text: &str, mode: Mode) -> String {
    let task = mode.task();
    format!(
        r#"
You are GrammarGuide, an English writing tutor.

Task: {task}

Analyze the following text and return a response in this EXACT format:

📝 REVIEW:
[Correct / Partially Correct / Incorrect]

🔍 ERRORS FOUND:
• Type: [type]
• Original: [text]
• Correction: [text]
• Rule: [rule]
• Explanation: [explanation]

💡 SUGGESTIONS:
• [Suggestion 1]
• [Suggestion 2]

✅ CORRECTED TEXT:
[text]

Rules:
- If multiple errors exist, repeat the "🔍 ERRORS FOUND" section for each.
- Output plain text only. No markdown fences.
Text to analyze: {text}
"#
    )
}
