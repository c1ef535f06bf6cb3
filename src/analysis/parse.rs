use serde::de::DeserializeOwned;

/// Outcome of parsing untrusted generator output.
#[derive(Debug)]
pub enum Parsed<T> {
    /// Parsed as-is after fence stripping.
    Strict(T),
    /// Parsed only after repair (trailing commas, single quotes, surrounding prose).
    Repaired(T),
    /// Neither pass produced the expected shape.
    ParseFailed(String),
}

impl<T> Parsed<T> {
    /// Collapse both successful passes; the failure carries the parse error.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Parsed::Strict(v) | Parsed::Repaired(v) => Ok(v),
            Parsed::ParseFailed(reason) => Err(reason),
        }
    }
}

/// Parse generator output into `T`: strip code fences, try a strict parse,
/// then retry on a repaired candidate.
pub fn parse_json<T: DeserializeOwned>(input: &str) -> Parsed<T> {
    let body = strip_fences(input);

    let strict_err = match serde_json::from_str::<T>(body) {
        Ok(v) => return Parsed::Strict(v),
        Err(e) => e,
    };

    let Some(candidate) = extract_json_region(body) else {
        return Parsed::ParseFailed(format!("no JSON object or array found ({})", strict_err));
    };

    if let Ok(v) = serde_json::from_str::<T>(candidate) {
        return Parsed::Repaired(v);
    }

    let repaired = repair(candidate);
    match serde_json::from_str::<T>(&repaired) {
        Ok(v) => Parsed::Repaired(v),
        Err(e) => Parsed::ParseFailed(e.to_string()),
    }
}

/// Remove a surrounding ```json / ``` fence if present.
fn strip_fences(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(idx) = trimmed.find("```") else {
        return trimmed;
    };
    let after_tag = &trimmed[idx + 3..];
    // Skip the rest of the opening fence line (language tag)
    let body_start = after_tag.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_tag[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    body[..end].trim()
}

/// Slice from the first `{`/`[` to its matching closer, ignoring brackets
/// inside strings. Unbalanced input takes everything to the last closer.
fn extract_json_region(input: &str) -> Option<&str> {
    let start = input.find(['{', '['])?;
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in input[start..].char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => in_string = Some(ch),
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    let end = input.rfind(['}', ']'])?;
    (end > start).then(|| &input[start..=end])
}

/// Lenient fixes: single-quoted strings become double-quoted, trailing
/// commas before a closer are dropped.
fn repair(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
                out.push(ch);
            } else if ch == '\\' {
                escaped = true;
                out.push(ch);
            } else if ch == quote {
                in_string = None;
                out.push('"');
            } else if ch == '"' && quote == '\'' {
                out.push_str("\\\"");
            } else {
                out.push(ch);
            }
            i += 1;
            continue;
        }

        match ch {
            '"' | '\'' => {
                in_string = Some(ch);
                out.push('"');
            }
            ',' => {
                // Look ahead past whitespace for a closer
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
        i += 1;
    }

    out
}
