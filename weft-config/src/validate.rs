//! Validation rules for project names and versions

/// Names that would collide with the qualified names weft assigns itself
pub(crate) const RESERVED_NAMES: &[&str] = &["weft", "builtin"];

/// Check if a name is reserved for weft's own extensions
pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Validate that a project name can head a qualified extension name.
/// Returns None if valid, Some(reason) if invalid
pub(crate) fn validate_identifier(name: &str) -> Option<&'static str> {
    let mut chars = name.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(_) => return Some("name must start with a letter or underscore"),
        None => return Some("name cannot be empty"),
    }

    let mut prev_was_dash = false;
    for c in chars {
        if c == '-' {
            if prev_was_dash {
                return Some("name cannot contain consecutive dashes");
            }
            prev_was_dash = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            prev_was_dash = false;
        } else if c == '.' {
            return Some("name cannot contain dots, they separate qualified name segments");
        } else {
            return Some("name must contain only letters, numbers, underscores, and dashes");
        }
    }

    if prev_was_dash {
        return Some("name cannot end with a dash");
    }

    None
}

/// Check a version made of dot-separated numbers, like `1.2.0`
pub(crate) fn is_valid_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("demo").is_none());
        assert!(validate_identifier("my_project").is_none());
        assert!(validate_identifier("my-project").is_none());
        assert!(validate_identifier("_internal2").is_none());
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(validate_identifier("").is_some());
        assert!(validate_identifier("2fast").is_some());
        assert!(validate_identifier("my project").is_some());
        assert!(validate_identifier("a.b").is_some());
        assert!(validate_identifier("double--dash").is_some());
        assert!(validate_identifier("trailing-").is_some());
    }

    #[test]
    fn test_reserved() {
        assert!(is_reserved("weft"));
        assert!(is_reserved("builtin"));
        assert!(!is_reserved("demo"));
    }

    #[test]
    fn test_versions() {
        assert!(is_valid_version("1"));
        assert!(is_valid_version("0.1.0"));
        assert!(is_valid_version("2024.10.18"));
        assert!(!is_valid_version(""));
        assert!(!is_valid_version("1..0"));
        assert!(!is_valid_version("1.0-beta"));
        assert!(!is_valid_version("v1"));
    }
}
