/// Return the identifier without surrounding double quotes or backticks.
pub fn unquote_identifier(ident: &str) -> &str {
    ident
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| ident.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .unwrap_or(ident)
}

/// Normalize an identifier for case-insensitive matching.
///
/// Trims whitespace, removes surrounding quotes on a single identifier,
/// and lowercases the result.
pub fn normalize_identifier(ident: &str) -> String {
    unquote_identifier(ident.trim()).to_ascii_lowercase()
}

/// Split a potentially schema-qualified name into `(schema, relation)`.
///
/// Handles dots inside quoted identifiers, e.g. `"my.schema"."table.name"`.
pub fn split_schema_and_relation(name: &str) -> Option<(String, String)> {
    let mut in_quotes = false;
    let mut start = 0usize;
    let mut parts: Vec<&str> = Vec::new();

    for (idx, ch) in name.char_indices() {
        match ch {
            '"' | '`' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                parts.push(name[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(name[start..].trim());

    if parts.len() < 2 {
        return None;
    }

    let schema = unquote_identifier(parts[parts.len() - 2]).to_string();
    let relation = unquote_identifier(parts[parts.len() - 1]).to_string();
    Some((schema, relation))
}

/// Normalize an object name to its terminal relation identifier.
///
/// Examples:
/// - `"public.customers"` -> `"customers"`
/// - `"\"sales\".\"Orders\""` -> `"orders"`
/// - `"EMP"` -> `"emp"`
pub fn normalize_relation_name(name: &str) -> String {
    if let Some((_, relation)) = split_schema_and_relation(name.trim()) {
        return normalize_identifier(&relation);
    }
    normalize_identifier(name)
}

/// Canonical catalog key for a table name: lowercased, unquoted, and
/// `schema.relation` when qualified.
pub fn canonical_table_name(name: &str) -> String {
    match split_schema_and_relation(name.trim()) {
        Some((schema, relation)) => format!(
            "{}.{}",
            schema.to_ascii_lowercase(),
            relation.to_ascii_lowercase()
        ),
        None => normalize_identifier(name),
    }
}

/// Build lookup keys for a table name, most specific first.
///
/// A schema-qualified name is tried verbatim (normalized) before falling back
/// to its bare relation, so `sales.orders` still finds a catalog that only
/// knows `orders`.
pub fn table_lookup_candidates(name: &str) -> Vec<String> {
    let mut candidates = vec![canonical_table_name(name)];
    if split_schema_and_relation(name).is_some() {
        let relation = normalize_relation_name(name);
        if !candidates.contains(&relation) {
            candidates.push(relation);
        }
    }
    candidates
}

/// True when `ident` is a plain `[A-Za-z0-9_]+` token that can be used as a
/// bind name without quoting.
pub fn is_simple_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_schema_and_relation_handles_quoted_dots() {
        assert_eq!(
            split_schema_and_relation(r#""my.schema"."table.name""#),
            Some(("my.schema".to_string(), "table.name".to_string()))
        );
        assert_eq!(split_schema_and_relation("customers"), None);
    }

    #[test]
    fn normalize_relation_name_handles_schema_quotes_and_case() {
        assert_eq!(normalize_relation_name("public.customers"), "customers");
        assert_eq!(normalize_relation_name(r#""sales"."Orders""#), "orders");
        assert_eq!(normalize_relation_name("`EMP`"), "emp");
    }

    #[test]
    fn canonical_table_name_strips_quotes_per_part() {
        assert_eq!(canonical_table_name(r#""Sales"."Orders""#), "sales.orders");
        assert_eq!(canonical_table_name(" Customers "), "customers");
    }

    #[test]
    fn table_lookup_candidates_prefer_qualified_then_relation() {
        assert_eq!(
            table_lookup_candidates("Sales.Orders"),
            vec!["sales.orders".to_string(), "orders".to_string()]
        );
        assert_eq!(table_lookup_candidates("orders"), vec!["orders".to_string()]);
    }

    #[test]
    fn simple_identifier_rejects_punctuation() {
        assert!(is_simple_identifier("customer_id"));
        assert!(is_simple_identifier("C1"));
        assert!(!is_simple_identifier("order-date"));
        assert!(!is_simple_identifier("\"id\""));
        assert!(!is_simple_identifier(""));
    }
}
