use crate::GeneratedItem;

#[derive(serde::Deserialize)]
struct LlmChild {
    name: String,
    #[serde(default)]
    description: String,
}

/// Parse raw LLM output into generated items. Returns empty vec on total
/// parse failure (graceful degradation); children with empty names are
/// dropped.
pub fn parse_generated(raw: &str) -> Vec<GeneratedItem> {
    let Some(json_str) = extract_json_array(raw) else {
        return vec![];
    };

    // Full array parse first; a malformed array degrades to per-object
    // salvage.
    let children: Vec<LlmChild> =
        serde_json::from_str(json_str).unwrap_or_else(|_| salvage_objects(json_str));

    children
        .into_iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| GeneratedItem {
            name: c.name.trim().to_string(),
            description: c.description.trim().to_string(),
        })
        .collect()
}

/// Locate the JSON array in raw LLM output: unwrap a markdown code fence if
/// present, then take the span from the first `[` to its matching bracket.
/// Quoted strings are honored so a bracket inside generated text cannot
/// close the array early.
fn extract_json_array(raw: &str) -> Option<&str> {
    let body = strip_code_fence(raw);
    let start = body.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in body[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest)
}

/// Pull whatever well-formed objects remain out of a malformed array, one
/// `{...}` span at a time. Objects that fail to parse individually are
/// skipped rather than sinking the batch.
fn salvage_objects(json_str: &str) -> Vec<LlmChild> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut obj_start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in json_str.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    obj_start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = obj_start.take() {
                        if let Ok(child) = serde_json::from_str::<LlmChild>(&json_str[s..=i]) {
                            out.push(child);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    out
}
