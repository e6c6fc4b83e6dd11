use sqlparser::ast::Statement;
use sqlparser::dialect::Dialect;

use crate::classifier::statement_kind::{classify, StatementKind};
use crate::error::{Error, Result};
use crate::mapping::naming::{is_valid_identifier, to_identifier};
use crate::mapping::type_mapper::TypeMapper;
use crate::metadata::columns::{resolve_dml_columns, resolve_select, TableSchemas};
use crate::metadata::parameters::extract;
use crate::metadata::scope::{from_tables, primary_select};
use crate::metadata::source::{CatalogColumn, MetadataSource};
use crate::metadata::statement::{
    BoundParameter, DeleteMetadata, InsertMetadata, SelectMetadata, StatementMetadata,
    UpdateMetadata,
};
use crate::parser::names::{canonical_table_name, normalize_identifier};
use crate::parser::placeholders::{scan_placeholders, Clause, PlaceholderScan};
use crate::parser::sql_parser::parse_single_statement;

/// Turn one SQL statement into exactly one [`StatementMetadata`].
///
/// Classifies the statement, extracts its bind parameters, resolves its
/// columns against the tables it touches and builds the matching shape.
/// Statements that are not SELECT/INSERT/UPDATE/DELETE are rejected.
pub fn analyze(
    sql: &str,
    source: &mut dyn MetadataSource,
    mapper: &TypeMapper,
    dialect: &dyn Dialect,
) -> Result<StatementMetadata> {
    if sql.trim().is_empty() {
        return Err(Error::invalid("sql must not be empty"));
    }

    let kind = classify(dialect, sql);
    tracing::debug!(%kind, "classified statement");
    if kind == StatementKind::Unknown {
        return Err(Error::invalid(
            "sql must be a SELECT, INSERT, UPDATE or DELETE statement",
        ));
    }

    let parameters = extract(sql, source, mapper, dialect)?;

    if kind.is_dml_write() {
        analyze_dml(kind, sql, source, dialect, parameters)
    } else {
        analyze_select(sql, source, dialect, parameters)
    }
}

fn analyze_select(
    sql: &str,
    source: &mut dyn MetadataSource,
    dialect: &dyn Dialect,
    parameters: Vec<BoundParameter>,
) -> Result<StatementMetadata> {
    let statement = parse_single_statement(dialect, sql)
        .map_err(|e| Error::invalid(format!("SELECT could not be parsed: {e}")))?;
    let select = match &statement {
        Statement::Query(query) => primary_select(query),
        _ => None,
    }
    .ok_or_else(|| Error::invalid("statement has no SELECT projection"))?;

    let scope = from_tables(&select.from);
    let schemas = load_schemas(source, scope.iter().map(|t| t.name.as_str()))?;
    let projected_columns = resolve_select(select, &schemas);
    tracing::info!(
        fields = projected_columns.len(),
        tables = scope.len(),
        "resolved SELECT projection"
    );

    Ok(StatementMetadata::Select(SelectMetadata {
        projected_columns,
        parameters,
        raw_sql: sql.to_string(),
    }))
}

fn analyze_dml(
    kind: StatementKind,
    sql: &str,
    source: &mut dyn MetadataSource,
    dialect: &dyn Dialect,
    mut parameters: Vec<BoundParameter>,
) -> Result<StatementMetadata> {
    let scan = scan_placeholders(dialect, sql)
        .map_err(|e| Error::invalid(format!("{kind} could not be tokenized: {e}")))?;
    let table = scan
        .target_table
        .clone()
        .ok_or_else(|| Error::invalid(format!("{kind} statement has no target table")))?;
    let table_columns = source.table_columns(&table)?;

    name_written_parameters(&mut parameters, &scan, &table_columns);
    let where_names = where_column_names(&scan);

    let metadata = match kind {
        StatementKind::Insert => {
            let names: Vec<String> = if scan.insert_columns.is_empty() {
                table_columns.iter().map(|c| c.name.clone()).collect()
            } else {
                scan.insert_columns.clone()
            };
            let columns = resolve_dml_columns(&names, &table, &table_columns);
            StatementMetadata::Insert(InsertMetadata::new(table, columns, parameters, sql)?)
        }
        StatementKind::Update => {
            let set_columns = resolve_dml_columns(&scan.set_columns, &table, &table_columns);
            let where_columns = resolve_dml_columns(&where_names, &table, &table_columns);
            StatementMetadata::Update(UpdateMetadata::new(
                table,
                set_columns,
                where_columns,
                parameters,
                sql,
            )?)
        }
        _ => {
            let where_columns = resolve_dml_columns(&where_names, &table, &table_columns);
            StatementMetadata::Delete(DeleteMetadata::new(table, where_columns, parameters, sql)?)
        }
    };
    Ok(metadata)
}

/// Fetch the schema of each named table once, keyed by canonical name.
pub fn load_schemas<'a>(
    source: &mut dyn MetadataSource,
    tables: impl IntoIterator<Item = &'a str>,
) -> Result<TableSchemas> {
    let mut schemas = TableSchemas::new();
    for table in tables {
        let key = canonical_table_name(table);
        if schemas.contains_key(&key) {
            continue;
        }
        let columns = source.table_columns(table)?;
        schemas.insert(key, columns);
    }
    Ok(schemas)
}

/// Name SET and VALUES placeholders after the column they write.
fn name_written_parameters(
    parameters: &mut [BoundParameter],
    scan: &PlaceholderScan,
    table_columns: &[CatalogColumn],
) {
    for parameter in parameters.iter_mut() {
        if !matches!(parameter.clause, Clause::Set | Clause::Values) {
            continue;
        }
        if parameter.bound_column.is_none() {
            let position = scan
                .sites
                .get(parameter.ordinal_position - 1)
                .and_then(|site| site.value_index);
            if let (Some(index), true) = (position, scan.insert_columns.is_empty()) {
                parameter.bound_column = table_columns.get(index).map(|c| c.name.clone());
            }
        }
        if let Some(column) = &parameter.bound_column {
            let name = to_identifier(column);
            if is_valid_identifier(&name) {
                parameter.resolved_name = name;
            } else {
                tracing::debug!(
                    position = parameter.ordinal_position,
                    column = %column,
                    "column name is not a usable identifier; keeping positional name"
                );
            }
        }
    }
}

fn where_column_names(scan: &PlaceholderScan) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for column in &scan.where_columns {
        let key = normalize_identifier(&column.column);
        if !names.iter().any(|n| normalize_identifier(n) == key) {
            names.push(column.column.clone());
        }
    }
    names
}
