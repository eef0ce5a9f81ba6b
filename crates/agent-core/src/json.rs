/// Pull the first JSON object out of free-form model output.
///
/// Accepts a bare object, an object inside a fenced code block, or an object
/// embedded in prose.
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    raw.split('{').nth(1).and_then(|rest| {
        let mut depth = 1i32;
        for (idx, ch) in rest.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let mut candidate = String::from("{");
                        candidate.push_str(&rest[..=idx]);
                        return Some(trim_symmetric(&candidate));
                    }
                }
                _ => {}
            }
        }
        None
    })
}

/// Strip a single surrounding markdown code fence (optionally language tagged)
/// when the whole text is one fenced block. Anything else is returned unchanged.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return raw;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return raw;
    };
    let body = match inner.find('\n') {
        Some(newline)
            if inner[..newline]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            &inner[newline + 1..]
        }
        _ => inner,
    };
    body.trim()
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_fenced_block() {
        let input = "Here is my decision:\n```json\n{\"thinking\":\"go\"}\n```";
        let extracted = extract_json_object(input).expect("json");
        assert!(extracted.contains("\"thinking\""));
        assert!(extracted.starts_with('{'));
    }

    #[test]
    fn extracts_from_inline_object() {
        let input = "text { \"foo\": 1 } more";
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, "{ \"foo\": 1 }");
    }

    #[test]
    fn returns_none_when_missing() {
        assert!(extract_json_object("no braces").is_none());
    }

    #[test]
    fn strips_language_tagged_fence() {
        assert_eq!(strip_code_fence("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn leaves_partial_fences_alone() {
        let input = "see ```json\n{}\n``` above";
        assert_eq!(strip_code_fence(input), input);
        assert_eq!(strip_code_fence("not json"), "not json");
    }
}
