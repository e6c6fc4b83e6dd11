use std::collections::BTreeMap;

use sqlparser::ast::{ColumnDef, ColumnOption, CreateTable, Statement, TableConstraint};
use sqlparser::dialect::Dialect;

use crate::metadata::source::CatalogColumn;
use crate::parser::expr::extract_column_ref;
use crate::parser::names::{canonical_table_name, normalize_identifier};
use crate::parser::sql_parser::parse_statements;

/// Parse `CREATE TABLE` statements into per-table column lists.
///
/// Keys are normalized table names as written (`sales.orders` stays
/// qualified). Statements other than `CREATE TABLE` are ignored so a full
/// migration script can be fed in unchanged.
pub fn parse_table_schemas(
    dialect: &dyn Dialect,
    ddl: &str,
) -> Result<BTreeMap<String, Vec<CatalogColumn>>, String> {
    let statements = parse_statements(dialect, ddl).map_err(|e| format!("DDL parse error: {e}"))?;

    let mut tables = BTreeMap::new();
    for statement in &statements {
        if let Statement::CreateTable(create) = statement {
            let name = canonical_table_name(&create.name.to_string());
            tables.insert(name, table_columns(create));
        }
    }
    Ok(tables)
}

fn table_columns(create: &CreateTable) -> Vec<CatalogColumn> {
    let primary_key = table_level_primary_key(create);
    create
        .columns
        .iter()
        .map(|column| {
            let mut catalog_column = column_from_def(column);
            if primary_key.contains(&normalize_identifier(&catalog_column.name)) {
                catalog_column.nullable = false;
            }
            catalog_column
        })
        .collect()
}

fn column_from_def(column: &ColumnDef) -> CatalogColumn {
    let mut nullable = true;
    for option in &column.options {
        match &option.option {
            ColumnOption::NotNull => nullable = false,
            ColumnOption::Null => nullable = true,
            ColumnOption::PrimaryKey(_) => nullable = false,
            _ => {}
        }
    }

    CatalogColumn {
        name: column.name.value.clone(),
        type_name: column.data_type.to_string(),
        nullable,
    }
}

/// Columns named by a table-level `PRIMARY KEY (a, b)` constraint.
fn table_level_primary_key(create: &CreateTable) -> Vec<String> {
    create
        .constraints
        .iter()
        .filter_map(|constraint| match constraint {
            TableConstraint::PrimaryKey(key) => Some(&key.columns),
            _ => None,
        })
        .flatten()
        .filter_map(|column| extract_column_ref(&column.column.expr))
        .map(|column| normalize_identifier(&column.column))
        .collect()
}
