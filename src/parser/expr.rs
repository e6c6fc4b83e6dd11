use sqlparser::ast::{Expr, Function};

/// A column reference as written in SQL, optionally qualified by a table
/// name or alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or alias immediately preceding the column, if any.
    pub qualifier: Option<String>,
    /// Terminal column identifier.
    pub column: String,
}

/// Extract a column reference from an expression.
///
/// Supports plain identifiers (`customer_id`) and qualified identifiers
/// (`sales.c.customer_id`); the qualifier kept is the part immediately
/// before the column (`c`). Casts and parentheses are looked through.
pub fn extract_column_ref(expr: &Expr) -> Option<ColumnRef> {
    match expr {
        Expr::Identifier(ident) => Some(ColumnRef {
            qualifier: None,
            column: ident.value.clone(),
        }),
        Expr::CompoundIdentifier(parts) => {
            let column = parts.last()?.value.clone();
            let qualifier = parts
                .len()
                .checked_sub(2)
                .and_then(|idx| parts.get(idx))
                .map(|ident| ident.value.clone());
            Some(ColumnRef { qualifier, column })
        }
        Expr::Nested(inner) => extract_column_ref(inner),
        Expr::Cast { expr, .. } => extract_column_ref(expr),
        _ => None,
    }
}

/// Declared SQL type of a `CAST(expr AS type)` / `expr::type` projection.
pub fn cast_type_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Cast { data_type, .. } => Some(data_type.to_string()),
        Expr::Nested(inner) => cast_type_name(inner),
        _ => None,
    }
}

/// Lowercased terminal name of a function call (`COUNT(*)` -> `count`).
pub fn function_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Function(Function { name, .. }) => Some(
            crate::parser::names::normalize_relation_name(&name.to_string()),
        ),
        Expr::Nested(inner) => function_name(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::ast::Ident;
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn column_name(expr: &Expr) -> Option<String> {
        extract_column_ref(expr).map(|r| r.column)
    }

    fn parse_expr(sql: &str) -> Expr {
        Parser::new(&GenericDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap()
    }

    #[test]
    fn extract_column_ref_handles_simple_and_qualified_identifiers() {
        let simple = Expr::Identifier(Ident::new("customer_id"));
        let qualified = Expr::CompoundIdentifier(vec![
            Ident::new("sales"),
            Ident::new("c"),
            Ident::new("customer_id"),
        ]);
        let nested = Expr::Nested(Box::new(Expr::Identifier(Ident::new("customer_id"))));

        assert_eq!(
            extract_column_ref(&simple),
            Some(ColumnRef {
                qualifier: None,
                column: "customer_id".to_string()
            })
        );
        assert_eq!(
            extract_column_ref(&qualified),
            Some(ColumnRef {
                qualifier: Some("c".to_string()),
                column: "customer_id".to_string()
            })
        );
        assert_eq!(column_name(&nested).as_deref(), Some("customer_id"));
    }

    #[test]
    fn cast_projection_exposes_target_type() {
        let expr = parse_expr("CAST(total AS DECIMAL(10,2))");
        assert_eq!(column_name(&expr).as_deref(), Some("total"));
        assert_eq!(cast_type_name(&expr).as_deref(), Some("DECIMAL(10,2)"));
    }

    #[test]
    fn function_name_is_lowercased() {
        let expr = parse_expr("COUNT(*)");
        assert_eq!(function_name(&expr).as_deref(), Some("count"));
        assert_eq!(column_name(&expr), None);
    }
}
