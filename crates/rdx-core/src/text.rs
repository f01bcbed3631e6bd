/// Diagnostic cap used by dataset validation.
pub const VALIDATE_DIAGNOSTIC_CAP: usize = 220;
/// Diagnostic cap used by prediction evaluation.
pub const EVAL_DIAGNOSTIC_CAP: usize = 300;

/// Collapse all whitespace runs to single spaces and cap the result at `max`
/// characters, ending in `...` when truncated.
pub fn normalize_diagnostic(text: &str, max: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= max {
        return normalized;
    }
    let keep = max.saturating_sub(3);
    let mut out: String = normalized.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Turn an arbitrary identifier into a valid rustc crate name.
///
/// Non `[A-Za-z0-9_]` characters become `_`; a leading digit gets `{prefix}_`,
/// and an empty input becomes `prefix`.
pub fn sanitize_crate_name(value: &str, prefix: &str) -> String {
    let name: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match name.chars().next() {
        None => prefix.to_string(),
        Some(c) if c.is_ascii_digit() => format!("{prefix}_{name}"),
        Some(_) => name,
    }
}
