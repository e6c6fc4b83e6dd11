//! SELECT projections are matched against the FROM/JOIN tables: an explicit
//! qualifier wins, then the unique table declaring the column. A column no
//! table declares has no owning table. Each table's columns are indexed by name once, so cost
//! grows with the number of projected items, not with items times tables.
//! DML columns come straight from the statement and are enriched from the
//! single target table.

use std::collections::{BTreeMap, HashMap};

use sqlparser::ast::{Expr, Select, SelectItem, Statement};
use sqlparser::dialect::Dialect;

use crate::error::{Error, Result};
use crate::metadata::scope::{from_tables, primary_select, TableScope};
use crate::metadata::source::CatalogColumn;
use crate::metadata::statement::ColumnDescriptor;
use crate::parser::expr::{cast_type_name, extract_column_ref, function_name};
use crate::parser::names::{canonical_table_name, normalize_identifier, normalize_relation_name};
use crate::parser::sql_parser::parse_single_statement;

/// Source type given to columns nothing is known about.
pub const DEFAULT_COLUMN_TYPE: &str = "VARCHAR";

/// Table schemas keyed by canonical table name.
pub type TableSchemas = BTreeMap<String, Vec<CatalogColumn>>;

struct ScopedTable<'a> {
    scope: TableScope,
    columns: &'a [CatalogColumn],
    by_name: HashMap<String, &'a CatalogColumn>,
}

/// Name indexes over the tables of one SELECT.
struct ProjectionIndex<'a> {
    tables: Vec<ScopedTable<'a>>,
    declaring: HashMap<String, Vec<usize>>,
    anywhere: HashMap<String, &'a CatalogColumn>,
}

impl<'a> ProjectionIndex<'a> {
    fn build(scope: Vec<TableScope>, schemas: &'a TableSchemas) -> Self {
        let mut declaring: HashMap<String, Vec<usize>> = HashMap::new();
        let mut tables = Vec::with_capacity(scope.len());

        for (idx, table) in scope.into_iter().enumerate() {
            let columns = schema_for(schemas, &table.name);
            let mut by_name = HashMap::with_capacity(columns.len());
            for column in columns {
                let key = normalize_identifier(&column.name);
                let owners = declaring.entry(key.clone()).or_default();
                if owners.last() != Some(&idx) {
                    owners.push(idx);
                }
                by_name.entry(key).or_insert(column);
            }
            tables.push(ScopedTable {
                scope: table,
                columns,
                by_name,
            });
        }

        let mut anywhere = HashMap::new();
        for column in schemas.values().flatten() {
            anywhere
                .entry(normalize_identifier(&column.name))
                .or_insert(column);
        }

        Self {
            tables,
            declaring,
            anywhere,
        }
    }

    fn table_for_qualifier(&self, qualifier: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.scope.answers_to(qualifier))
    }

    fn owner_of(&self, qualifier: Option<&str>, column: &str) -> Option<usize> {
        if let Some(qualifier) = qualifier {
            return self.table_for_qualifier(qualifier);
        }
        match self.declaring.get(column).map(Vec::as_slice) {
            Some([only]) => Some(*only),
            _ => None,
        }
    }
}

fn schema_for<'a>(schemas: &'a TableSchemas, table: &str) -> &'a [CatalogColumn] {
    if let Some(columns) = schemas.get(&canonical_table_name(table)) {
        return columns;
    }
    schemas
        .get(&normalize_relation_name(table))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn descriptor_from_catalog(column: &CatalogColumn, owner: &TableScope) -> ColumnDescriptor {
    ColumnDescriptor {
        source_name: column.name.clone(),
        source_type_name: column.type_name.clone(),
        is_nullable: column.nullable,
        alias: None,
        owning_table: Some(owner.relation()),
        type_defaulted: false,
    }
}

/// Resolve the projection of a SELECT statement text.
pub fn resolve_projection(
    sql: &str,
    dialect: &dyn Dialect,
    schemas: &TableSchemas,
) -> Result<Vec<ColumnDescriptor>> {
    let statement = parse_single_statement(dialect, sql)
        .map_err(|e| Error::invalid(format!("SELECT could not be parsed: {e}")))?;
    let select = match &statement {
        Statement::Query(query) => primary_select(query),
        _ => None,
    }
    .ok_or_else(|| Error::invalid("statement has no SELECT projection"))?;
    Ok(resolve_select(select, schemas))
}

/// Resolve the projection of an already parsed SELECT.
pub fn resolve_select(select: &Select, schemas: &TableSchemas) -> Vec<ColumnDescriptor> {
    let index = ProjectionIndex::build(from_tables(&select.from), schemas);
    let mut resolved = Vec::with_capacity(select.projection.len());

    for (position, item) in select.projection.iter().enumerate() {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                resolved.push(resolve_expr(&index, expr, None, position + 1));
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                resolved.push(resolve_expr(
                    &index,
                    expr,
                    Some(alias.value.clone()),
                    position + 1,
                ));
            }
            SelectItem::Wildcard(_) => {
                if index.tables.iter().all(|t| t.columns.is_empty()) {
                    tracing::warn!("SELECT * over tables without schema; no fields produced");
                }
                for table in &index.tables {
                    resolved.extend(
                        table
                            .columns
                            .iter()
                            .map(|c| descriptor_from_catalog(c, &table.scope)),
                    );
                }
            }
            other => {
                let text = other.to_string();
                let Some(qualifier) = text.strip_suffix(".*") else {
                    tracing::warn!(item = %text, "unsupported projection item skipped");
                    continue;
                };
                match index.table_for_qualifier(qualifier) {
                    Some(idx) => {
                        let table = &index.tables[idx];
                        resolved.extend(
                            table
                                .columns
                                .iter()
                                .map(|c| descriptor_from_catalog(c, &table.scope)),
                        );
                    }
                    None => {
                        tracing::warn!(qualifier, "qualified wildcard names no table in scope");
                    }
                }
            }
        }
    }
    resolved
}

fn resolve_expr(
    index: &ProjectionIndex<'_>,
    expr: &Expr,
    alias: Option<String>,
    position: usize,
) -> ColumnDescriptor {
    let cast = cast_type_name(expr);

    let Some(column_ref) = extract_column_ref(expr) else {
        let source_name = function_name(expr).unwrap_or_else(|| format!("column{position}"));
        let (source_type_name, type_defaulted) = match cast {
            Some(cast) => (cast, false),
            None if source_name == "count" => ("BIGINT".to_string(), false),
            None => (DEFAULT_COLUMN_TYPE.to_string(), true),
        };
        return ColumnDescriptor {
            source_name,
            source_type_name,
            is_nullable: true,
            alias,
            owning_table: None,
            type_defaulted,
        };
    };

    let key = normalize_identifier(&column_ref.column);
    let owner = index.owner_of(column_ref.qualifier.as_deref(), &key);
    let declared = owner.and_then(|idx| index.tables[idx].by_name.get(&key).copied());

    if owner.is_none() {
        tracing::debug!(
            column = %column_ref.column,
            "projected column has no unique owning table"
        );
    }

    let fallback = || {
        index.anywhere.get(&key).copied().or_else(|| {
            tracing::debug!(column = %column_ref.column, "no schema declares column; using text");
            None
        })
    };
    let best = declared.or_else(fallback);

    let (source_type_name, type_defaulted) = match (cast, best) {
        (Some(cast), _) => (cast, false),
        (None, Some(column)) => (column.type_name.clone(), false),
        (None, None) => (DEFAULT_COLUMN_TYPE.to_string(), true),
    };

    ColumnDescriptor {
        source_name: column_ref.column.clone(),
        source_type_name,
        is_nullable: best.map_or(true, |c| c.nullable),
        alias,
        owning_table: owner.map(|idx| index.tables[idx].scope.relation()),
        type_defaulted,
    }
}

/// Describe DML columns named by the statement, enriched from the target
/// table. Names missing from the table keep the text type.
pub fn resolve_dml_columns(
    names: &[String],
    table: &str,
    table_columns: &[CatalogColumn],
) -> Vec<ColumnDescriptor> {
    let by_name: HashMap<String, &CatalogColumn> = table_columns
        .iter()
        .map(|c| (normalize_identifier(&c.name), c))
        .collect();
    let owner = normalize_relation_name(table);

    names
        .iter()
        .map(|name| match by_name.get(&normalize_identifier(name)) {
            Some(column) => ColumnDescriptor {
                source_name: name.clone(),
                source_type_name: column.type_name.clone(),
                is_nullable: column.nullable,
                alias: None,
                owning_table: Some(owner.clone()),
                type_defaulted: false,
            },
            None => {
                tracing::warn!(column = %name, table, "column not in table schema; using text");
                ColumnDescriptor {
                    source_name: name.clone(),
                    source_type_name: DEFAULT_COLUMN_TYPE.to_string(),
                    is_nullable: true,
                    alias: None,
                    owning_table: Some(owner.clone()),
                    type_defaulted: true,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::sql_parser::default_dialect;
    use pretty_assertions::assert_eq;

    fn col(name: &str, type_name: &str, nullable: bool) -> CatalogColumn {
        CatalogColumn {
            name: name.to_string(),
            type_name: type_name.to_string(),
            nullable,
        }
    }

    fn schemas() -> TableSchemas {
        let mut schemas = TableSchemas::new();
        schemas.insert(
            "customers".to_string(),
            vec![
                col("customer_id", "INTEGER", false),
                col("name", "VARCHAR(100)", false),
                col("status", "VARCHAR(20)", true),
            ],
        );
        schemas.insert(
            "orders".to_string(),
            vec![
                col("order_id", "BIGINT", false),
                col("customer_id", "INTEGER", false),
                col("total", "DECIMAL(12,2)", true),
            ],
        );
        schemas
    }

    fn resolve(sql: &str) -> Vec<ColumnDescriptor> {
        resolve_projection(sql, default_dialect().as_ref(), &schemas()).expect("resolve")
    }

    fn owners(columns: &[ColumnDescriptor]) -> Vec<(&str, Option<&str>, &str)> {
        columns
            .iter()
            .map(|c| {
                (
                    c.output_name(),
                    c.owning_table.as_deref(),
                    c.source_type_name.as_str(),
                )
            })
            .collect()
    }

    #[test]
    fn qualifiers_unique_declarations_and_ties() {
        let columns = resolve(
            "SELECT c.customer_id, name, total AS amount, customer_id FROM customers c JOIN orders o ON o.customer_id = c.customer_id",
        );
        assert_eq!(
            owners(&columns),
            vec![
                ("customer_id", Some("customers"), "INTEGER"),
                ("name", Some("customers"), "VARCHAR(100)"),
                ("amount", Some("orders"), "DECIMAL(12,2)"),
                ("customer_id", None, "INTEGER"),
            ]
        );
        assert!(!columns[3].type_defaulted);
    }

    #[test]
    fn wildcards_expand_in_scope_order() {
        let columns = resolve("SELECT o.*, c.name FROM orders o JOIN customers c ON c.customer_id = o.customer_id");
        let names: Vec<&str> = columns.iter().map(|c| c.source_name.as_str()).collect();
        assert_eq!(names, vec!["order_id", "customer_id", "total", "name"]);

        let all = resolve("SELECT * FROM customers, orders");
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn expressions_unknown_columns_and_casts() {
        let columns = resolve(
            "SELECT COUNT(*) AS n, 1 + 1, CAST(total AS DOUBLE) AS t, mystery FROM orders",
        );
        assert_eq!(columns[0].source_name, "count");
        assert_eq!(columns[0].source_type_name, "BIGINT");
        assert_eq!(columns[1].source_name, "column2");
        assert!(columns[1].type_defaulted);
        assert_eq!(columns[2].source_type_name, "DOUBLE");
        assert_eq!(columns[3].owning_table, None);
        assert_eq!(columns[3].source_type_name, DEFAULT_COLUMN_TYPE);
        assert!(columns[3].type_defaulted);
    }

    #[test]
    fn unmatched_columns_borrow_type_by_name() {
        let columns = resolve("SELECT x.status FROM archive x");
        assert_eq!(columns[0].owning_table.as_deref(), Some("archive"));
        assert_eq!(columns[0].source_type_name, "VARCHAR(20)");
    }

    #[test]
    fn non_select_is_rejected() {
        let err = resolve_projection("DELETE FROM t WHERE a = 1", default_dialect().as_ref(), &schemas())
            .expect_err("not a select");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn dml_columns_are_enriched_from_target() {
        let columns = resolve_dml_columns(
            &["NAME".to_string(), "nickname".to_string()],
            "public.customers",
            &schemas()["customers"],
        );
        assert_eq!(columns[0].source_type_name, "VARCHAR(100)");
        assert!(!columns[0].is_nullable);
        assert_eq!(columns[0].owning_table.as_deref(), Some("customers"));
        assert!(columns[1].type_defaulted);
    }
}
