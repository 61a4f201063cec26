// ABOUTME: Naming conventions linking column names, model names, and table names
// ABOUTME: Pluralization is an explicit policy behind an injectable trait

/// Resolves a foreign-key-shaped column name to the table it references.
///
/// Kept behind a trait so the convention (and its failure mode: the caller
/// warns and falls back to identity) stays an explicit, testable policy.
pub trait TableNameResolver {
    /// Returns the table expected to hold the rows a `<name>_id` column
    /// points at, or `None` if the column is not foreign-key shaped.
    fn referenced_table(&self, column: &str) -> Option<String>;
}

/// Rails-style convention: strip the `_id` suffix and pluralize.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConventionNames;

impl TableNameResolver for ConventionNames {
    fn referenced_table(&self, column: &str) -> Option<String> {
        let base = column.strip_suffix("_id")?;
        if base.is_empty() {
            return None;
        }
        Some(pluralize(base))
    }
}

/// Pluralize the final word of a snake_case name.
pub fn pluralize(word: &str) -> String {
    const IRREGULAR: &[(&str, &str)] = &[("person", "people"), ("child", "children")];

    for (singular, plural) in IRREGULAR {
        if let Some(prefix) = word.strip_suffix(singular) {
            return format!("{prefix}{plural}");
        }
    }

    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{word}es");
    }

    if let Some(stem) = word.strip_suffix('y') {
        match stem.chars().last() {
            Some(c) if !"aeiou".contains(c) => return format!("{stem}ies"),
            _ => {}
        }
    }

    format!("{word}s")
}

/// CamelCase (optionally `Module::Nested`) to snake_case with `/` separators,
/// matching ActiveSupport's `underscore`.
pub fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    let chars: Vec<char> = name.replace("::", "/").chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let follows_lower = matches!(prev, Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let follows_upper = matches!(prev, Some(p) if p.is_ascii_uppercase());
            if follows_lower || (follows_upper && next_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Model name to table name: `Billing::LineItem` -> `billing_line_items`.
pub fn tableize(model: &str) -> String {
    let snake = underscore(model);
    let mut parts: Vec<&str> = snake.split('/').collect();
    let last = parts.pop().unwrap_or_default();
    let plural = pluralize(last);
    if parts.is_empty() {
        plural
    } else {
        format!("{}_{}", parts.join("_"), plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_common_forms() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("branch"), "branches");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("person"), "people");
    }

    #[test]
    fn test_referenced_table() {
        let names = ConventionNames;
        assert_eq!(names.referenced_table("author_id").as_deref(), Some("authors"));
        assert_eq!(names.referenced_table("status_id").as_deref(), Some("statuses"));
        assert_eq!(names.referenced_table("company_id").as_deref(), Some("companies"));
        assert_eq!(names.referenced_table("tenant_id").as_deref(), Some("tenants"));
        assert_eq!(names.referenced_table("name"), None);
        assert_eq!(names.referenced_table("_id"), None);
    }

    #[test]
    fn test_underscore() {
        assert_eq!(underscore("LineItem"), "line_item");
        assert_eq!(underscore("Billing::LineItem"), "billing/line_item");
        assert_eq!(underscore("HTTPRequest"), "http_request");
        assert_eq!(underscore("tenant"), "tenant");
    }

    #[test]
    fn test_tableize() {
        assert_eq!(tableize("Tenant"), "tenants");
        assert_eq!(tableize("Billing::LineItem"), "billing_line_items");
        assert_eq!(tableize("Category"), "categories");
    }
}
