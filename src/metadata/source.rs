use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlparser::dialect::Dialect;

use crate::error::MetadataError;
use crate::metadata::scope::{table_scope, TableScope};
use crate::parser::names::{canonical_table_name, normalize_identifier, table_lookup_candidates};
use crate::parser::placeholders::{scan_placeholders, PlaceholderSite};
use crate::parser::schema::parse_table_schemas;
use crate::parser::sql_parser::parse_single_statement;

/// One column as reported by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    /// Column name as declared.
    pub name: String,
    /// Declared source type, e.g. `VARCHAR(100)`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether the column accepts NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Per-position driver types of a prepared statement.
pub trait ParameterMetadata {
    /// Number of bind positions. Drivers may report zero or a negative
    /// value when introspection is unsupported.
    fn parameter_count(&self) -> i64;

    /// Driver type name of the 1-based `position`.
    fn parameter_type_name(&self, position: usize) -> Result<String, MetadataError>;
}

/// A handle able to introspect statements and tables.
///
/// Methods take `&mut self`: a source wraps one connection and two requests
/// must not interleave reads on it.
pub trait MetadataSource {
    /// Prepare `sql` and report its bind-parameter metadata.
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn ParameterMetadata>, MetadataError>;

    /// Ordered columns of `table`. An unknown table yields an empty list.
    fn table_columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>, MetadataError>;
}

#[derive(Debug, Deserialize)]
struct CatalogSnapshot {
    tables: BTreeMap<String, Vec<CatalogColumn>>,
}

/// Offline catalog snapshot built from DDL text or JSON.
///
/// `prepare` binds each placeholder to the column it is compared with or
/// inserted into and reports that column's declared type.
#[derive(Debug)]
pub struct Catalog {
    tables: BTreeMap<String, Vec<CatalogColumn>>,
    dialect: Box<dyn Dialect>,
}

impl Catalog {
    /// Empty catalog using `dialect` for statement scanning.
    pub fn new(dialect: Box<dyn Dialect>) -> Self {
        Self {
            tables: BTreeMap::new(),
            dialect,
        }
    }

    /// Catalog from `CREATE TABLE` statements.
    pub fn from_ddl(ddl: &str, dialect: Box<dyn Dialect>) -> Result<Self, MetadataError> {
        let mut catalog = Self::new(dialect);
        catalog.add_ddl(ddl)?;
        Ok(catalog)
    }

    /// Catalog from a JSON snapshot:
    ///
    /// ```json
    /// { "tables": { "customers": [ { "name": "id", "type": "INTEGER", "nullable": false } ] } }
    /// ```
    pub fn from_json(json: &str, dialect: Box<dyn Dialect>) -> Result<Self, MetadataError> {
        let mut catalog = Self::new(dialect);
        catalog.add_json(json)?;
        Ok(catalog)
    }

    /// Merge more `CREATE TABLE` statements; later definitions replace
    /// earlier ones of the same name.
    pub fn add_ddl(&mut self, ddl: &str) -> Result<(), MetadataError> {
        let tables =
            parse_table_schemas(self.dialect.as_ref(), ddl).map_err(MetadataError::Catalog)?;
        self.tables.extend(tables);
        Ok(())
    }

    /// Merge a JSON snapshot.
    pub fn add_json(&mut self, json: &str) -> Result<(), MetadataError> {
        let snapshot: CatalogSnapshot = serde_json::from_str(json)
            .map_err(|e| MetadataError::Catalog(format!("invalid catalog JSON: {e}")))?;
        for (name, columns) in snapshot.tables {
            self.tables.insert(canonical_table_name(&name), columns);
        }
        Ok(())
    }

    /// Number of known tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table is known.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Known table names (canonical form).
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    fn lookup(&self, table: &str) -> Option<&[CatalogColumn]> {
        for key in table_lookup_candidates(table) {
            if let Some(columns) = self.tables.get(&key) {
                return Some(columns);
            }
        }
        // A bare name may still match a single schema-qualified entry.
        let wanted = normalize_identifier(table);
        let mut matches = self
            .tables
            .iter()
            .filter(|(key, _)| key.rsplit('.').next() == Some(wanted.as_str()));
        match (matches.next(), matches.next()) {
            (Some((_, columns)), None) => Some(columns),
            _ => None,
        }
    }

    fn column_type_in(&self, table: &str, column: &str) -> Option<&str> {
        self.lookup(table)?
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
            .map(|c| c.type_name.as_str())
    }

    /// Declared type of the column a placeholder binds to.
    fn bind_type(
        &self,
        site: &PlaceholderSite,
        scope: &[TableScope],
        target: Option<&str>,
        insert_columns: &[String],
    ) -> Result<String, MetadataError> {
        let fail = |message: String| MetadataError::ParameterType {
            position: site.ordinal,
            message,
        };

        if let (None, Some(index), Some(table)) = (&site.column, site.value_index, target) {
            if insert_columns.is_empty() {
                let columns = self.lookup(table).unwrap_or_default();
                return columns
                    .get(index)
                    .map(|c| c.type_name.clone())
                    .ok_or_else(|| fail(format!("VALUES position {} has no column in '{table}'", index + 1)));
            }
        }

        let Some(column) = &site.column else {
            return Err(fail("placeholder is not bound to a column".to_string()));
        };

        let tables: Vec<&str> = match (&column.qualifier, target) {
            (Some(qualifier), _) => scope
                .iter()
                .filter(|t| t.answers_to(qualifier))
                .map(|t| t.name.as_str())
                .collect(),
            (None, Some(table)) if scope.is_empty() => vec![table],
            (None, _) => scope.iter().map(|t| t.name.as_str()).collect(),
        };

        let mut found: Vec<&str> = tables
            .iter()
            .filter_map(|table| self.column_type_in(table, &column.column))
            .collect();
        if found.is_empty() && tables.is_empty() {
            found = self
                .tables
                .keys()
                .filter_map(|table| self.column_type_in(table, &column.column))
                .collect();
        }
        found.dedup_by(|a, b| a.eq_ignore_ascii_case(b));

        match found.as_slice() {
            [type_name] => Ok((*type_name).to_string()),
            [] => Err(fail(format!("column '{}' not found in catalog", column.column))),
            _ => Err(fail(format!("column '{}' is ambiguous", column.column))),
        }
    }
}

/// Bind types computed by [`Catalog::prepare`].
#[derive(Debug)]
struct CatalogParameters {
    types: Vec<Result<String, MetadataError>>,
}

impl ParameterMetadata for CatalogParameters {
    fn parameter_count(&self) -> i64 {
        i64::try_from(self.types.len()).unwrap_or(i64::MAX)
    }

    fn parameter_type_name(&self, position: usize) -> Result<String, MetadataError> {
        position
            .checked_sub(1)
            .and_then(|idx| self.types.get(idx))
            .cloned()
            .unwrap_or_else(|| {
                Err(MetadataError::ParameterType {
                    position,
                    message: "position out of range".to_string(),
                })
            })
    }
}

impl MetadataSource for Catalog {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn ParameterMetadata>, MetadataError> {
        let scan = scan_placeholders(self.dialect.as_ref(), sql)
            .map_err(|e| MetadataError::Prepare(e.to_string()))?;
        let scope = match parse_single_statement(self.dialect.as_ref(), sql) {
            Ok(statement) => table_scope(&statement),
            Err(e) => {
                tracing::debug!(error = %e, "statement did not parse; binding against whole catalog");
                Vec::new()
            }
        };

        let types = scan
            .sites
            .iter()
            .map(|site| {
                self.bind_type(
                    site,
                    &scope,
                    scan.target_table.as_deref(),
                    &scan.insert_columns,
                )
            })
            .collect();
        Ok(Box::new(CatalogParameters { types }))
    }

    fn table_columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>, MetadataError> {
        match self.lookup(table) {
            Some(columns) => Ok(columns.to_vec()),
            None => {
                tracing::warn!(table, "table not found in catalog; columns fall back to text");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::sql_parser::default_dialect;

    const DDL: &str = r"
CREATE TABLE customers (customer_id INTEGER PRIMARY KEY, name VARCHAR(100) NOT NULL, status VARCHAR(20));
CREATE TABLE orders (order_id BIGINT PRIMARY KEY, customer_id INTEGER NOT NULL, total DECIMAL(12,2), status CHAR(1));
";

    fn catalog() -> Catalog {
        Catalog::from_ddl(DDL, default_dialect()).expect("ddl should load")
    }

    fn types(catalog: &mut Catalog, sql: &str) -> Vec<Result<String, MetadataError>> {
        let meta = catalog.prepare(sql).expect("prepare should succeed");
        (1..=meta.parameter_count() as usize)
            .map(|p| meta.parameter_type_name(p))
            .collect()
    }

    #[test]
    fn where_placeholders_take_column_types() {
        let mut catalog = catalog();
        let result = types(
            &mut catalog,
            "SELECT * FROM customers WHERE customer_id = ? AND status = ?",
        );
        assert_eq!(
            result,
            vec![Ok("INTEGER".to_string()), Ok("VARCHAR(20)".to_string())]
        );
    }

    #[test]
    fn alias_qualifier_disambiguates_shared_columns() {
        let mut catalog = catalog();
        let result = types(
            &mut catalog,
            "SELECT c.name FROM customers c JOIN orders o ON o.customer_id = c.customer_id WHERE o.status = ? AND c.status = ?",
        );
        assert_eq!(
            result,
            vec![Ok("CHAR(1)".to_string()), Ok("VARCHAR(20)".to_string())]
        );
    }

    #[test]
    fn ambiguous_and_unbound_placeholders_fail_individually() {
        let mut catalog = catalog();
        let result = types(
            &mut catalog,
            "SELECT * FROM customers c JOIN orders o ON o.customer_id = c.customer_id WHERE status = ? AND total BETWEEN ? AND ?",
        );
        assert_eq!(result.len(), 3);
        assert!(matches!(
            &result[0],
            Err(MetadataError::ParameterType { position: 1, message }) if message.contains("ambiguous")
        ));
        assert!(result[1].is_err());
    }

    #[test]
    fn insert_without_column_list_uses_table_order() {
        let mut catalog = catalog();
        let result = types(&mut catalog, "INSERT INTO orders VALUES (?, ?, ?, 'N')");
        assert_eq!(
            result,
            vec![
                Ok("BIGINT".to_string()),
                Ok("INTEGER".to_string()),
                Ok("DECIMAL(12,2)".to_string()),
            ]
        );
    }

    #[test]
    fn json_snapshot_and_unknown_tables() {
        let mut catalog = Catalog::from_json(
            r#"{"tables": {"Sales.Orders": [{"name": "id", "type": "BIGINT", "nullable": false}, {"name": "note", "type": "TEXT"}]}}"#,
            default_dialect(),
        )
        .expect("json should load");
        let columns = catalog.table_columns("orders").expect("lookup should succeed");
        assert_eq!(columns.len(), 2);
        assert!(columns[1].nullable);
        assert!(catalog.table_columns("missing").expect("no error").is_empty());
    }

    #[test]
    fn invalid_json_is_a_catalog_error() {
        let err = Catalog::from_json("{", default_dialect()).expect_err("bad json");
        assert!(matches!(err, MetadataError::Catalog(_)));
    }

    #[test]
    fn out_of_range_position_is_a_parameter_error() {
        let mut catalog = catalog();
        let meta = catalog.prepare("SELECT 1").expect("prepare");
        assert_eq!(meta.parameter_count(), 0);
        assert!(meta.parameter_type_name(1).is_err());
        assert!(meta.parameter_type_name(0).is_err());
    }
}
