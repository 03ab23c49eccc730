//! Shared text helpers.

/// Strip the common leading whitespace from every non-blank line.
///
/// The first line is handled separately when it is not blank: docstrings
/// usually start right after the opening quotes, so only the remaining lines
/// are dedented (e.g. `"Summary\n    more"` -> `"Summary\nmore"`).
pub fn dedent(text: &str) -> String {
    let text = text.trim_matches('\n');
    let (first, rest) = match text.split_once('\n') {
        Some((first, rest)) if !first.starts_with(char::is_whitespace) => {
            (Some(first), rest)
        }
        _ => (None, text),
    };

    let indent = rest
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let body = rest
        .lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n");

    match first {
        Some(first) => format!("{}\n{}", first, body).trim_end().to_string(),
        None => body.trim_end().to_string(),
    }
}

/// Pick the singular or plural form of a noun for `count`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
