use std::sync::LazyLock;

use regex::Regex;

static RE_FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap()
});

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Locate a single JSON object inside free-form model output.
///
/// Lookup order:
/// 1. a fenced code block (```json ... ```) wrapping an object
/// 2. the balanced `{ ... }` starting at the first `{`, string-aware
/// 3. the span from the first `{` to the last `}`
///
/// Returns `None` when the text contains no candidate object. The returned
/// slice is not validated as JSON.
pub fn extract_json_object(response: &str) -> Option<&str> {
    if let Some(caps) = RE_FENCED_JSON.captures(response) {
        if let Some(m) = caps.get(1) {
            return Some(m.as_str());
        }
    }

    let start = response.find('{')?;
    if let Some(end) = balanced_object_end(&response[start..]) {
        return Some(&response[start..start + end]);
    }

    let last = response.rfind('}')?;
    (last > start).then(|| &response[start..=last])
}

/// Byte length of the object starting at `s[0] == '{'`, if its braces balance.
fn balanced_object_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
