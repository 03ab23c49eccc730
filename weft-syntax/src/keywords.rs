//! Reserved words of the script language.

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Check if a name is a reserved keyword in extension scripts
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Check if a name is a valid, non-reserved identifier
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric()) && !is_keyword(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert!(is_keyword("class"));
        assert!(is_keyword("None"));
        assert!(!is_keyword("match"));
        assert!(!is_keyword("Extension"));
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("_private"));
        assert!(is_identifier("Extension2"));
        assert!(is_identifier("größe"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("import"));
        assert!(!is_identifier(""));
    }
}
