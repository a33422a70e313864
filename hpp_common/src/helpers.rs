/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Truncate `s` to at most `max_chars` characters, never splitting a multibyte character.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Returns true for values that explicitly switch an optional feature off (`none`, `false`, `0`).
pub fn is_disabled_value(value: &str) -> bool {
    ["none", "false", "0", "off"].contains(&value.trim().to_lowercase().as_str())
}
