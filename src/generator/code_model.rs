use std::collections::HashSet;

use serde::Serialize;
use sqlparser::dialect::Dialect;

use crate::classifier::statement_kind::StatementKind;
use crate::error::{Error, Result};
use crate::mapping::naming::{is_valid_identifier, to_identifier};
use crate::mapping::type_mapper::{TargetType, TypeMapper};
use crate::metadata::statement::{BoundParameter, ColumnDescriptor, StatementMetadata};
use crate::parser::names::normalize_identifier;
use crate::parser::placeholders::{rewrite_placeholders, Clause};

/// How a parameter reaches the generated endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterStyle {
    /// Route segment, `/{id}`.
    Path,
    /// Query-string filter.
    Query,
    /// Field of the request body.
    Body,
}

/// One record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelField {
    /// camelCase identifier.
    pub identifier: String,
    /// Target-language type.
    pub target_type: TargetType,
    /// Source column (or alias) the field reads.
    pub source_column: String,
    /// Whether the field may be null.
    pub nullable: bool,
    /// Table the column belongs to, when resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owning_table: Option<String>,
    /// Set when the type is a fallback.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub type_defaulted: bool,
}

/// One method/endpoint parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelParameter {
    /// 1-based placeholder position.
    pub ordinal: usize,
    /// camelCase identifier.
    pub identifier: String,
    /// Target-language type.
    pub target_type: TargetType,
    /// Name of the `:name` placeholder in the rewritten SQL.
    pub bind_name: String,
    /// Driver type name.
    pub source_type_name: String,
    /// Where the value comes from in the endpoint.
    pub style: ParameterStyle,
    /// Record field carrying the value, for body parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Set when the type is a fallback.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub type_defaulted: bool,
}

/// Artifact-agnostic description of what to generate for one statement.
///
/// Built once by [`build`] and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeModel {
    business_domain_name: String,
    statement_kind: StatementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<String>,
    fields: Vec<ModelField>,
    parameters: Vec<ModelParameter>,
    rewritten_sql: String,
    raw_sql: String,
}

impl CodeModel {
    /// Business-domain name as supplied.
    pub fn business_domain_name(&self) -> &str {
        &self.business_domain_name
    }

    /// Statement kind.
    pub fn statement_kind(&self) -> StatementKind {
        self.statement_kind
    }

    /// DML target table.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Record fields in column order.
    pub fn fields(&self) -> &[ModelField] {
        &self.fields
    }

    /// Parameters in placeholder order.
    pub fn parameters(&self) -> &[ModelParameter] {
        &self.parameters
    }

    /// SQL with `:name` placeholders.
    pub fn rewritten_sql(&self) -> &str {
        &self.rewritten_sql
    }

    /// SQL as supplied.
    pub fn raw_sql(&self) -> &str {
        &self.raw_sql
    }

    /// Parameters of one style.
    pub fn parameters_with_style(
        &self,
        style: ParameterStyle,
    ) -> impl Iterator<Item = &ModelParameter> {
        self.parameters.iter().filter(move |p| p.style == style)
    }

    /// Path and query parameters: the filter of the statement.
    pub fn filter_parameters(&self) -> impl Iterator<Item = &ModelParameter> {
        self.parameters
            .iter()
            .filter(|p| p.style != ParameterStyle::Body)
    }
}

/// Assemble a [`CodeModel`] from statement metadata.
pub fn build(
    metadata: &StatementMetadata,
    business_domain_name: &str,
    mapper: &TypeMapper,
    dialect: &dyn Dialect,
) -> Result<CodeModel> {
    if business_domain_name.trim().is_empty() {
        return Err(Error::invalid("businessDomainName must not be empty"));
    }

    let kind = metadata.kind();
    let columns = metadata.field_columns();
    if kind == StatementKind::Select && columns.is_empty() {
        return Err(Error::invalid("SELECT must project at least one column"));
    }

    let fields = build_fields(columns, mapper);
    let parameters = build_parameters(metadata, &fields);

    let bind_names: Vec<String> = parameters.iter().map(|p| p.bind_name.clone()).collect();
    let rewritten_sql = rewrite_placeholders(dialect, metadata.raw_sql(), &bind_names)
        .map_err(|e| Error::invalid(format!("placeholders could not be rewritten: {e}")))?;

    Ok(CodeModel {
        business_domain_name: business_domain_name.to_string(),
        statement_kind: kind,
        table: metadata.table().map(str::to_string),
        fields,
        parameters,
        rewritten_sql,
        raw_sql: metadata.raw_sql().to_string(),
    })
}

fn target_or_text(mapper: &TypeMapper, source_type_name: &str) -> (TargetType, bool) {
    match mapper.target_type_for(source_type_name) {
        Ok(target) => (target, false),
        Err(_) => (TargetType::String, true),
    }
}

fn build_fields(columns: &[ColumnDescriptor], mapper: &TypeMapper) -> Vec<ModelField> {
    let identifiers = disambiguate(
        columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let identifier = to_identifier(column.output_name());
                if !is_valid_identifier(&identifier) {
                    format!("field{}", idx + 1)
                } else {
                    identifier
                }
            })
            .collect(),
    );

    columns
        .iter()
        .zip(identifiers)
        .map(|(column, identifier)| {
            let (target_type, fallback) = target_or_text(mapper, &column.source_type_name);
            ModelField {
                identifier,
                target_type,
                source_column: column.output_name().to_string(),
                nullable: column.is_nullable,
                owning_table: column.owning_table.clone(),
                type_defaulted: column.type_defaulted || fallback,
            }
        })
        .collect()
}

fn build_parameters(metadata: &StatementMetadata, fields: &[ModelField]) -> Vec<ModelParameter> {
    let bound = metadata.parameters();
    let path_ordinal = path_parameter(metadata);
    let bind_names = disambiguate_with_ordinals(bound);

    bound
        .iter()
        .zip(bind_names)
        .map(|(parameter, bind_name)| {
            let style = match parameter.clause {
                Clause::Set | Clause::Values => ParameterStyle::Body,
                _ if Some(parameter.ordinal_position) == path_ordinal => ParameterStyle::Path,
                _ => ParameterStyle::Query,
            };
            let field = match style {
                ParameterStyle::Body => parameter.bound_column.as_deref().and_then(|column| {
                    let column = normalize_identifier(column);
                    fields
                        .iter()
                        .find(|f| normalize_identifier(&f.source_column) == column)
                        .map(|f| f.identifier.clone())
                }),
                _ => None,
            };
            ModelParameter {
                ordinal: parameter.ordinal_position,
                identifier: bind_name.clone(),
                target_type: parameter.target_type,
                bind_name,
                source_type_name: parameter.source_type_name.clone(),
                style,
                field,
                type_defaulted: parameter.type_defaulted,
            }
        })
        .collect()
}

/// Ordinal of the single-key parameter of an UPDATE/DELETE: there must be
/// exactly one WHERE column, and exactly one WHERE placeholder bound to it.
fn path_parameter(metadata: &StatementMetadata) -> Option<usize> {
    if !matches!(
        metadata.kind(),
        StatementKind::Update | StatementKind::Delete
    ) {
        return None;
    }
    let [key] = metadata.where_columns() else {
        return None;
    };
    let key = normalize_identifier(&key.source_name);

    let mut where_parameters = metadata
        .parameters()
        .iter()
        .filter(|p| p.clause == Clause::Where);
    match (where_parameters.next(), where_parameters.next()) {
        (Some(only), None)
            if only
                .bound_column
                .as_deref()
                .is_some_and(|c| normalize_identifier(c) == key) =>
        {
            Some(only.ordinal_position)
        }
        _ => None,
    }
}

/// Make names unique by appending the 1-based position on collision.
fn disambiguate(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| unique_name(&mut seen, name, idx + 1))
        .collect()
}

fn disambiguate_with_ordinals(parameters: &[BoundParameter]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(parameters.len());
    parameters
        .iter()
        .map(|p| unique_name(&mut seen, p.resolved_name.clone(), p.ordinal_position))
        .collect()
}

fn unique_name(seen: &mut HashSet<String>, name: String, ordinal: usize) -> String {
    let mut candidate = name;
    while seen.contains(&candidate) {
        candidate = format!("{candidate}{ordinal}");
    }
    seen.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::statement::{DeleteMetadata, SelectMetadata, UpdateMetadata};
    use crate::parser::sql_parser::default_dialect;

    fn column(name: &str, type_name: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            source_name: name.to_string(),
            source_type_name: type_name.to_string(),
            is_nullable: true,
            alias: None,
            owning_table: Some("t".to_string()),
            type_defaulted: false,
        }
    }

    fn param(ordinal: usize, name: &str, clause: Clause, column: Option<&str>) -> BoundParameter {
        BoundParameter {
            ordinal_position: ordinal,
            resolved_name: name.to_string(),
            target_type: TargetType::Integer,
            source_type_name: "INTEGER".to_string(),
            clause,
            bound_column: column.map(str::to_string),
            type_defaulted: false,
        }
    }

    fn build_model(metadata: &StatementMetadata) -> CodeModel {
        build(metadata, "Customer", &TypeMapper::new(), default_dialect().as_ref()).expect("model")
    }

    #[test]
    fn empty_business_name_is_rejected() {
        let metadata = StatementMetadata::Select(SelectMetadata {
            projected_columns: vec![column("id", "INT")],
            parameters: vec![],
            raw_sql: "SELECT id FROM t".to_string(),
        });
        let err = build(&metadata, " ", &TypeMapper::new(), default_dialect().as_ref()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: businessDomainName must not be empty");
    }

    #[test]
    fn select_without_columns_is_rejected() {
        let metadata = StatementMetadata::Select(SelectMetadata {
            projected_columns: vec![],
            parameters: vec![],
            raw_sql: "SELECT * FROM t".to_string(),
        });
        let err = build(&metadata, "Customer", &TypeMapper::new(), default_dialect().as_ref())
            .unwrap_err();
        assert!(err.to_string().contains("at least one column"));
    }

    #[test]
    fn single_where_column_is_path_style() {
        let metadata = StatementMetadata::Delete(
            DeleteMetadata::new(
                "t",
                vec![column("customer_id", "INT")],
                vec![param(1, "customerId", Clause::Where, Some("customer_id"))],
                "DELETE FROM t WHERE customer_id = ?",
            )
            .expect("delete"),
        );
        let model = build_model(&metadata);
        assert_eq!(model.parameters()[0].style, ParameterStyle::Path);
        assert_eq!(model.rewritten_sql(), "DELETE FROM t WHERE customer_id = :customerId");
    }

    #[test]
    fn two_where_columns_are_query_style() {
        let metadata = StatementMetadata::Delete(
            DeleteMetadata::new(
                "t",
                vec![column("a", "INT"), column("b", "INT")],
                vec![
                    param(1, "a", Clause::Where, Some("a")),
                    param(2, "b", Clause::Where, Some("b")),
                ],
                "DELETE FROM t WHERE a = ? AND b = ?",
            )
            .expect("delete"),
        );
        let model = build_model(&metadata);
        assert!(model
            .parameters()
            .iter()
            .all(|p| p.style == ParameterStyle::Query));
    }

    #[test]
    fn update_set_parameters_are_body_and_collisions_get_ordinals() {
        let metadata = StatementMetadata::Update(
            UpdateMetadata::new(
                "t",
                vec![column("price", "DECIMAL")],
                vec![column("id", "INT")],
                vec![
                    param(1, "price", Clause::Set, Some("price")),
                    param(2, "id", Clause::Where, Some("id")),
                    param(3, "price", Clause::Where, Some("price")),
                ],
                "UPDATE t SET price = ? WHERE id = ? AND price < ?",
            )
            .expect("update"),
        );
        let model = build_model(&metadata);
        let summary: Vec<(&str, ParameterStyle, Option<&str>)> = model
            .parameters()
            .iter()
            .map(|p| (p.bind_name.as_str(), p.style, p.field.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("price", ParameterStyle::Body, Some("price")),
                ("id", ParameterStyle::Query, None),
                ("price3", ParameterStyle::Query, None),
            ]
        );
        assert_eq!(
            model.rewritten_sql(),
            "UPDATE t SET price = :price WHERE id = :id AND price < :price3"
        );
    }

    #[test]
    fn field_identifiers_are_unique() {
        let metadata = StatementMetadata::Select(SelectMetadata {
            projected_columns: vec![column("customer_id", "INT"), column("CUSTOMER_ID", "INT"), column("___", "INT")],
            parameters: vec![],
            raw_sql: "SELECT a.customer_id, b.CUSTOMER_ID, ___ FROM a, b".to_string(),
        });
        let model = build_model(&metadata);
        let names: Vec<&str> = model.fields().iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(names, vec!["customerId", "customerId2", "field3"]);
    }

    #[test]
    fn placeholder_count_mismatch_is_reported() {
        let metadata = StatementMetadata::Select(SelectMetadata {
            projected_columns: vec![column("id", "INT")],
            parameters: vec![param(1, "id", Clause::Where, Some("id"))],
            raw_sql: "SELECT id FROM t".to_string(),
        });
        let err = build(&metadata, "Customer", &TypeMapper::new(), default_dialect().as_ref())
            .unwrap_err();
        assert!(err.to_string().contains("could not be rewritten"));
    }
}
