use serde_json::Value;

/// Collapses runs of whitespace (including newlines) into single spaces.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to `max_chars` characters, appending `...` when anything was
/// cut. Char-based so multibyte text never splits.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut truncated = String::with_capacity(max_chars + 3);
    for ch in text.chars().take(max_chars) {
        truncated.push(ch);
    }
    truncated.push_str("...");
    truncated
}

#[must_use]
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Joins a list of content blocks into one text, taking each block's `text`
/// member when it is an object and the block itself when it is a string.
/// Multimodal lists with no textual blocks yield `None`.
#[must_use]
pub fn join_content_blocks(blocks: &[Value]) -> Option<String> {
    let fragments = blocks
        .iter()
        .filter_map(|block| match block {
            Value::String(text) => non_empty(text),
            Value::Object(map) => map.get("text").and_then(Value::as_str).and_then(non_empty),
            _ => None,
        })
        .collect::<Vec<_>>();

    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(" "))
    }
}
