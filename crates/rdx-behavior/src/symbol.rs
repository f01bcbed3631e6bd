use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("No function definition found")]
pub struct SymbolNotFound;

/// Name of the primary callable function in `source`.
///
/// The first line-leading `pub fn name(` wins; when there is none, the first
/// bare `fn name(`. Generic functions (`fn name<T>(`) count too.
pub fn locate_public_symbol(source: &str) -> Result<String, SymbolNotFound> {
    let mut first_private = None;
    for line in source.lines() {
        let rest = line.trim_start();
        if let Some(after_pub) = strip_keyword(rest, "pub") {
            if let Some(name) = fn_name(after_pub) {
                return Ok(name.to_string());
            }
        } else if first_private.is_none() {
            first_private = fn_name(rest);
        }
    }
    first_private.map(str::to_string).ok_or(SymbolNotFound)
}

/// `keyword` followed by at least one whitespace character; returns what follows.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    let trimmed = rest.trim_start();
    (trimmed.len() < rest.len()).then_some(trimmed)
}

fn fn_name(text: &str) -> Option<&str> {
    let rest = strip_keyword(text, "fn")?;
    let end = rest
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(rest.len(), |(i, _)| i);
    let name = &rest[..end];
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    matches!(rest[end..].trim_start().chars().next(), Some('(' | '<')).then_some(name)
}
