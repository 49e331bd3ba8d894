//! Field path helpers.
//!
//! Paths use dots for identifier-like keys (`spec.tags`), brackets with a
//! quoted key for anything else (`metadata.labels["app.kubernetes.io"]`)
//! and bare brackets for list indices (`spec.rules[2]`).

/// Separator between the two resource names of a link name.
const LINK_SEPARATOR: &str = "::";

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Appends a map key to a path.
#[must_use]
pub fn field_path(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), is_identifier(key)) {
        (true, true) => key.to_string(),
        (false, true) => format!("{prefix}.{key}"),
        (_, false) => format!("{prefix}[{key:?}]"),
    }
}

/// Appends a list index to a path.
#[must_use]
pub fn index_path(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// Returns true if `path` equals `ancestor` or lies beneath it.
#[must_use]
pub fn is_under_path(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('['))
}

/// Builds the name of the link from `resource_a` to `resource_b`.
#[must_use]
pub fn link_name(resource_a: &str, resource_b: &str) -> String {
    format!("{resource_a}{LINK_SEPARATOR}{resource_b}")
}

/// Splits a link name into its source and target resource names.
#[must_use]
pub fn split_link_name(name: &str) -> Option<(&str, &str)> {
    name.split_once(LINK_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path() {
        assert_eq!(field_path("", "spec"), "spec");
        assert_eq!(field_path("spec", "memory_size"), "spec.memory_size");
        assert_eq!(
            field_path("metadata.labels", "app.kubernetes.io"),
            r#"metadata.labels["app.kubernetes.io"]"#
        );
        assert_eq!(index_path("spec.rules", 2), "spec.rules[2]");
    }

    #[test]
    fn test_is_under_path() {
        assert!(is_under_path("spec.tags[0].key", "spec.tags"));
        assert!(is_under_path("spec.tags", "spec.tags"));
        assert!(!is_under_path("spec.tagsExtra", "spec.tags"));
    }

    #[test]
    fn test_link_name_round_trip() {
        let name = link_name("ordersFunction", "ordersTable");
        assert_eq!(name, "ordersFunction::ordersTable");
        assert_eq!(split_link_name(&name), Some(("ordersFunction", "ordersTable")));
        assert_eq!(split_link_name("noSeparator"), None);
    }
}
