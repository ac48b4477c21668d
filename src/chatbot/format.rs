//! Post-processing of model output before it goes back to Telegram.

/// Per-message character ceiling. Telegram allows 4096; the rest is headroom.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Header the model writes before the corrected text.
pub const CORRECTED_MARKER: &str = "✅ CORRECTED TEXT:";

const FENCE: &str = "```";

/// Clean up a raw model reply and split it into sendable chunks.
///
/// Always returns at least one chunk.
pub fn format_response(raw: &str) -> Vec<String> {
    // The model sometimes ignores the "no markdown fences" rule.
    let text = raw.trim().replace(FENCE, "");
    let text = wrap_corrected_text(&text);
    split_chunks(&text, MAX_MESSAGE_CHARS)
}

/// Put the first line after the corrected-text marker in a fenced block so
/// Telegram shows it as one-tap copyable.
fn wrap_corrected_text(text: &str) -> String {
    let Some((before, after)) = text.split_once(CORRECTED_MARKER) else {
        return text.to_string();
    };

    let after = after.trim();
    let (first_line, rest) = after.split_once('\n').unwrap_or((after, ""));
    let corrected = first_line.trim();

    format!("{before}{CORRECTED_MARKER}\n{FENCE}\n{corrected}\n{FENCE}\n{rest}")
}

/// Slice `text` into contiguous runs of at most `max_chars` characters.
///
/// No attempt is made to break on word or line boundaries.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() || max_chars == 0 {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_one_empty_chunk() {
        assert_eq!(format_response(""), vec![String::new()]);
        assert_eq!(format_response("  \n\t "), vec![String::new()]);
    }

    #[test]
    fn test_trims_and_strips_fences() {
        let chunks = format_response("\n  ```\n📝 REVIEW:\nCorrect\n```  \n");
        assert_eq!(chunks, vec!["\n📝 REVIEW:\nCorrect\n".to_string()]);
    }

    #[test]
    fn test_wraps_only_first_corrected_line() {
        let chunks = format_response("✅ CORRECTED TEXT:\nHello world\nmore text");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "✅ CORRECTED TEXT:\n```\nHello world\n```\nmore text");
    }

    #[test]
    fn test_corrected_line_is_trimmed() {
        let chunks = format_response("📝 REVIEW:\nIncorrect\n\n✅ CORRECTED TEXT:\n   She goes to school.   ");
        assert_eq!(
            chunks[0],
            "📝 REVIEW:\nIncorrect\n\n✅ CORRECTED TEXT:\n```\nShe goes to school.\n```\n"
        );
    }

    #[test]
    fn test_corrected_text_on_marker_line() {
        let chunks = format_response("✅ CORRECTED TEXT: Fixed it.");
        assert_eq!(chunks[0], "✅ CORRECTED TEXT:\n```\nFixed it.\n```\n");
    }

    #[test]
    fn test_model_fences_replaced_by_single_block() {
        let raw = "✅ CORRECTED TEXT:\n```\nI am here.\n```";
        let chunks = format_response(raw);
        assert_eq!(chunks[0], "✅ CORRECTED TEXT:\n```\nI am here.\n```\n");
        assert_eq!(chunks[0].matches(FENCE).count(), 2);
    }

    #[test]
    fn test_only_first_marker_splits() {
        let raw = "✅ CORRECTED TEXT:\nOne.\n✅ CORRECTED TEXT:\nTwo.";
        let chunks = format_response(raw);
        assert_eq!(chunks[0], "✅ CORRECTED TEXT:\n```\nOne.\n```\n✅ CORRECTED TEXT:\nTwo.");
    }

    #[test]
    fn test_idempotent_without_marker_or_fences() {
        let raw = "  📝 REVIEW:\nCorrect\n\n💡 SUGGESTIONS:\n• none  ";
        let once = format_response(raw).concat();
        let twice = format_response(&once).concat();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_long_output_is_paginated() {
        let raw = "a".repeat(9000);
        let chunks = format_response(&raw);
        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![4000, 4000, 1000]);
        assert_eq!(chunks.concat(), raw);
    }

    #[test]
    fn test_exact_limit_is_single_chunk() {
        let raw = "b".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(format_response(&raw).len(), 1);
        assert_eq!(format_response(&format!("{raw}c")).len(), 2);
    }

    #[test]
    fn test_pagination_counts_chars_not_bytes() {
        let raw = "é".repeat(4001);
        let chunks = format_response(&raw);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 4000);
        assert_eq!(chunks[1], "é");
    }

    #[test]
    fn test_split_chunks_small_limit() {
        assert_eq!(split_chunks("abcdefg", 3), vec!["abc", "def", "g"]);
    }
}
