use serde::Serialize;

use crate::classifier::statement_kind::StatementKind;
use crate::error::{Error, Result};
use crate::mapping::type_mapper::TargetType;
use crate::parser::placeholders::Clause;

fn is_false(value: &bool) -> bool {
    !*value
}

/// One catalog or projected column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name as written in SQL or declared in the catalog.
    pub source_name: String,
    /// Declared source type.
    pub source_type_name: String,
    /// Whether the column accepts NULL.
    pub is_nullable: bool,
    /// Projection alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Table the column was resolved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owning_table: Option<String>,
    /// Set when the type is a fallback rather than catalog data.
    #[serde(skip_serializing_if = "is_false")]
    pub type_defaulted: bool,
}

impl ColumnDescriptor {
    /// Alias if present, otherwise the source name.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.source_name)
    }
}

/// One positional bind parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundParameter {
    /// 1-based placeholder position.
    pub ordinal_position: usize,
    /// Identifier used for the parameter (`param<N>` when none was derived).
    pub resolved_name: String,
    /// Target-language type.
    pub target_type: TargetType,
    /// Driver type name reported by the metadata source.
    pub source_type_name: String,
    /// Clause the placeholder sits in.
    pub clause: Clause,
    /// Column the placeholder is compared with or assigned to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_column: Option<String>,
    /// Set when the driver type lookup failed and text was substituted.
    #[serde(skip_serializing_if = "is_false")]
    pub type_defaulted: bool,
}

/// Metadata of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectMetadata {
    /// Output columns in projection order.
    pub projected_columns: Vec<ColumnDescriptor>,
    /// Bind parameters in placeholder order.
    pub parameters: Vec<BoundParameter>,
    /// The statement as supplied.
    pub raw_sql: String,
}

/// Metadata of an INSERT. Always has at least one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertMetadata {
    table: String,
    inserted_columns: Vec<ColumnDescriptor>,
    parameters: Vec<BoundParameter>,
    raw_sql: String,
}

impl InsertMetadata {
    /// Validate and build.
    pub fn new(
        table: impl Into<String>,
        inserted_columns: Vec<ColumnDescriptor>,
        parameters: Vec<BoundParameter>,
        raw_sql: impl Into<String>,
    ) -> Result<Self> {
        let table = require_table(table.into(), StatementKind::Insert)?;
        if inserted_columns.is_empty() {
            return Err(Error::invalid(format!(
                "INSERT into '{table}' must name at least one column"
            )));
        }
        Ok(Self {
            table,
            inserted_columns,
            parameters,
            raw_sql: raw_sql.into(),
        })
    }

    /// Target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Inserted columns in statement order.
    pub fn inserted_columns(&self) -> &[ColumnDescriptor] {
        &self.inserted_columns
    }
}

/// Metadata of an UPDATE. SET must be non-empty; WHERE may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateMetadata {
    table: String,
    set_columns: Vec<ColumnDescriptor>,
    where_columns: Vec<ColumnDescriptor>,
    parameters: Vec<BoundParameter>,
    raw_sql: String,
}

impl UpdateMetadata {
    /// Validate and build. An UPDATE without WHERE columns is accepted and
    /// logged.
    pub fn new(
        table: impl Into<String>,
        set_columns: Vec<ColumnDescriptor>,
        where_columns: Vec<ColumnDescriptor>,
        parameters: Vec<BoundParameter>,
        raw_sql: impl Into<String>,
    ) -> Result<Self> {
        let table = require_table(table.into(), StatementKind::Update)?;
        if set_columns.is_empty() {
            return Err(Error::invalid(format!(
                "UPDATE of '{table}' must assign at least one column"
            )));
        }
        if where_columns.is_empty() {
            tracing::warn!(table = %table, "UPDATE has no WHERE columns; every row will be updated");
        }
        Ok(Self {
            table,
            set_columns,
            where_columns,
            parameters,
            raw_sql: raw_sql.into(),
        })
    }

    /// Target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Assigned columns in SET order.
    pub fn set_columns(&self) -> &[ColumnDescriptor] {
        &self.set_columns
    }

    /// Columns tested in WHERE.
    pub fn where_columns(&self) -> &[ColumnDescriptor] {
        &self.where_columns
    }
}

/// Metadata of a DELETE. WHERE must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteMetadata {
    table: String,
    where_columns: Vec<ColumnDescriptor>,
    parameters: Vec<BoundParameter>,
    raw_sql: String,
}

impl DeleteMetadata {
    /// Validate and build. An unconditional DELETE is rejected.
    pub fn new(
        table: impl Into<String>,
        where_columns: Vec<ColumnDescriptor>,
        parameters: Vec<BoundParameter>,
        raw_sql: impl Into<String>,
    ) -> Result<Self> {
        let table = require_table(table.into(), StatementKind::Delete)?;
        if where_columns.is_empty() {
            return Err(Error::invalid(format!(
                "DELETE from '{table}' requires at least one WHERE column"
            )));
        }
        Ok(Self {
            table,
            where_columns,
            parameters,
            raw_sql: raw_sql.into(),
        })
    }

    /// Target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns tested in WHERE.
    pub fn where_columns(&self) -> &[ColumnDescriptor] {
        &self.where_columns
    }
}

fn require_table(table: String, kind: StatementKind) -> Result<String> {
    if table.trim().is_empty() {
        return Err(Error::invalid(format!("{kind} statement has no target table")));
    }
    Ok(table)
}

/// Exactly one of the four statement shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum StatementMetadata {
    /// SELECT.
    Select(SelectMetadata),
    /// INSERT.
    Insert(InsertMetadata),
    /// UPDATE.
    Update(UpdateMetadata),
    /// DELETE.
    Delete(DeleteMetadata),
}

impl StatementMetadata {
    /// Statement kind of this shape.
    pub fn kind(&self) -> StatementKind {
        match self {
            StatementMetadata::Select(_) => StatementKind::Select,
            StatementMetadata::Insert(_) => StatementKind::Insert,
            StatementMetadata::Update(_) => StatementKind::Update,
            StatementMetadata::Delete(_) => StatementKind::Delete,
        }
    }

    /// Bind parameters in placeholder order.
    pub fn parameters(&self) -> &[BoundParameter] {
        match self {
            StatementMetadata::Select(m) => &m.parameters,
            StatementMetadata::Insert(m) => &m.parameters,
            StatementMetadata::Update(m) => &m.parameters,
            StatementMetadata::Delete(m) => &m.parameters,
        }
    }

    /// The statement as supplied.
    pub fn raw_sql(&self) -> &str {
        match self {
            StatementMetadata::Select(m) => &m.raw_sql,
            StatementMetadata::Insert(m) => &m.raw_sql,
            StatementMetadata::Update(m) => &m.raw_sql,
            StatementMetadata::Delete(m) => &m.raw_sql,
        }
    }

    /// DML target table; `None` for SELECT.
    pub fn table(&self) -> Option<&str> {
        match self {
            StatementMetadata::Select(_) => None,
            StatementMetadata::Insert(m) => Some(m.table()),
            StatementMetadata::Update(m) => Some(m.table()),
            StatementMetadata::Delete(m) => Some(m.table()),
        }
    }

    /// Columns that become record fields: the projection for SELECT, the
    /// written columns for INSERT/UPDATE, and the WHERE columns for DELETE.
    pub fn field_columns(&self) -> &[ColumnDescriptor] {
        match self {
            StatementMetadata::Select(m) => &m.projected_columns,
            StatementMetadata::Insert(m) => m.inserted_columns(),
            StatementMetadata::Update(m) => m.set_columns(),
            StatementMetadata::Delete(m) => m.where_columns(),
        }
    }

    /// Columns tested in WHERE; empty for SELECT and INSERT.
    pub fn where_columns(&self) -> &[ColumnDescriptor] {
        match self {
            StatementMetadata::Update(m) => m.where_columns(),
            StatementMetadata::Delete(m) => m.where_columns(),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            source_name: name.to_string(),
            source_type_name: "INTEGER".to_string(),
            is_nullable: false,
            alias: None,
            owning_table: Some("t".to_string()),
            type_defaulted: false,
        }
    }

    #[test]
    fn delete_without_where_columns_is_rejected() {
        let err = DeleteMetadata::new("t", vec![], vec![], "DELETE FROM t").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: DELETE from 't' requires at least one WHERE column"
        );
    }

    #[test]
    fn update_without_where_columns_is_accepted() {
        let update = UpdateMetadata::new("t", vec![column("a")], vec![], vec![], "UPDATE t SET a = 1")
            .expect("unconditional update is permitted");
        assert!(update.where_columns().is_empty());
    }

    #[test]
    fn update_without_set_columns_is_rejected() {
        let err = UpdateMetadata::new("t", vec![], vec![column("id")], vec![], "UPDATE t").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn insert_requires_columns_and_table() {
        assert!(InsertMetadata::new("t", vec![], vec![], "INSERT INTO t").is_err());
        assert!(InsertMetadata::new(" ", vec![column("a")], vec![], "INSERT").is_err());
        let insert = InsertMetadata::new("t", vec![column("a")], vec![], "INSERT INTO t (a) VALUES (1)")
            .expect("valid insert");
        assert_eq!(insert.table(), "t");
    }

    #[test]
    fn shared_contract_accessors() {
        let delete = StatementMetadata::Delete(
            DeleteMetadata::new("t", vec![column("id")], vec![], "DELETE FROM t WHERE id = 1")
                .expect("valid delete"),
        );
        assert_eq!(delete.kind(), StatementKind::Delete);
        assert_eq!(delete.table(), Some("t"));
        assert_eq!(delete.field_columns().len(), 1);
        assert_eq!(delete.where_columns().len(), 1);
        assert!(delete.parameters().is_empty());
    }
}
