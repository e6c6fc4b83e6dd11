use sqlparser::dialect::Dialect;

use crate::error::{Error, Result};
use crate::mapping::naming::{is_valid_identifier, to_identifier};
use crate::mapping::type_mapper::{TargetType, TypeMapper};
use crate::metadata::source::MetadataSource;
use crate::metadata::statement::BoundParameter;
use crate::parser::placeholders::{scan_placeholders, Clause, PlaceholderScan};

/// Source type substituted when a parameter's driver type is unavailable.
pub const DEFAULT_PARAMETER_TYPE: &str = "VARCHAR";

/// Extract bind parameters of `sql` in placeholder order.
///
/// Types come from `source.prepare`; a failing prepare is returned as is.
/// A failing per-position type lookup only degrades that parameter to
/// text. Names come from `column <op> ?` comparisons in the top-level WHERE
/// clause; anything else is named `param<N>`.
pub fn extract(
    sql: &str,
    source: &mut dyn MetadataSource,
    mapper: &TypeMapper,
    dialect: &dyn Dialect,
) -> Result<Vec<BoundParameter>> {
    if sql.trim().is_empty() {
        return Err(Error::invalid("sql must not be empty"));
    }

    let metadata = source.prepare(sql)?;
    let count = metadata.parameter_count();
    if count <= 0 {
        return Ok(Vec::new());
    }
    let reported = usize::try_from(count).unwrap_or(usize::MAX);
    // A positional statement cannot hold more placeholders than `?` characters.
    let ceiling = sql.matches('?').count();
    if reported > ceiling {
        tracing::warn!(
            driver = reported,
            ceiling,
            "driver reports more parameters than the statement text holds; clamping"
        );
    }
    let count = reported.min(ceiling);

    let scan = match scan_placeholders(dialect, sql) {
        Ok(scan) => scan,
        Err(e) => {
            tracing::warn!(error = %e, "could not tokenize statement; parameters get positional names");
            PlaceholderScan::default()
        }
    };
    if scan.count() != count {
        tracing::debug!(
            driver = count,
            scanned = scan.count(),
            "driver and text disagree on placeholder count"
        );
    }

    let mut parameters = Vec::new();
    for position in 1..=count {
        let (source_type_name, mut type_defaulted) = match metadata.parameter_type_name(position) {
            Ok(type_name) => (type_name, false),
            Err(e) => {
                tracing::warn!(position, error = %e, "parameter type lookup failed; using text");
                (DEFAULT_PARAMETER_TYPE.to_string(), true)
            }
        };
        let target_type = match mapper.target_type_for(&source_type_name) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(position, error = %e, "unusable driver type; using text");
                type_defaulted = true;
                TargetType::String
            }
        };

        let site = scan.sites.get(position - 1);
        let resolved_name = site
            .and_then(|s| s.where_column())
            .map(|column| to_identifier(&column.column))
            .filter(|name| is_valid_identifier(name))
            .unwrap_or_else(|| {
                tracing::debug!(position, "no WHERE column for placeholder; using positional name");
                positional_name(position)
            });

        parameters.push(BoundParameter {
            ordinal_position: position,
            resolved_name,
            target_type,
            source_type_name,
            clause: site.map_or(Clause::Other, |s| s.clause),
            bound_column: site.and_then(|s| s.column.as_ref()).map(|c| c.column.clone()),
            type_defaulted,
        });
    }
    Ok(parameters)
}

/// Synthetic name of the 1-based `position`.
pub fn positional_name(position: usize) -> String {
    format!("param{position}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;
    use crate::metadata::source::{CatalogColumn, ParameterMetadata};
    use sqlparser::dialect::GenericDialect;

    struct Fixed {
        count: i64,
        types: Vec<std::result::Result<String, MetadataError>>,
    }

    impl ParameterMetadata for Fixed {
        fn parameter_count(&self) -> i64 {
            self.count
        }
        fn parameter_type_name(&self, position: usize) -> std::result::Result<String, MetadataError> {
            self.types[position - 1].clone()
        }
    }

    struct Source {
        count: i64,
        types: Vec<std::result::Result<String, MetadataError>>,
    }

    impl MetadataSource for Source {
        fn prepare(
            &mut self,
            _sql: &str,
        ) -> std::result::Result<Box<dyn ParameterMetadata>, MetadataError> {
            Ok(Box::new(Fixed {
                count: self.count,
                types: self.types.clone(),
            }))
        }
        fn table_columns(
            &mut self,
            _table: &str,
        ) -> std::result::Result<Vec<CatalogColumn>, MetadataError> {
            Ok(Vec::new())
        }
    }

    fn run(sql: &str, count: i64, types: Vec<std::result::Result<String, MetadataError>>) -> Vec<BoundParameter> {
        let mut source = Source { count, types };
        extract(sql, &mut source, &TypeMapper::new(), &GenericDialect {}).expect("extract")
    }

    #[test]
    fn where_names_and_driver_types() {
        let params = run(
            "SELECT * FROM customers WHERE customer_id = ? AND status = ?",
            2,
            vec![Ok("INTEGER".to_string()), Ok("VARCHAR".to_string())],
        );
        let summary: Vec<(&str, TargetType, &str)> = params
            .iter()
            .map(|p| (p.resolved_name.as_str(), p.target_type, p.source_type_name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("customerId", TargetType::Integer, "INTEGER"),
                ("status", TargetType::String, "VARCHAR"),
            ]
        );
    }

    #[test]
    fn one_failing_type_does_not_fail_the_rest() {
        let params = run(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            2,
            vec![
                Err(MetadataError::ParameterType {
                    position: 1,
                    message: "unsupported".to_string(),
                }),
                Ok("BIGINT".to_string()),
            ],
        );
        assert_eq!(params[0].source_type_name, "VARCHAR");
        assert!(params[0].type_defaulted);
        assert_eq!(params[1].target_type, TargetType::Long);
        assert!(!params[1].type_defaulted);
    }

    #[test]
    fn non_positive_count_yields_nothing() {
        assert!(run("SELECT 1", 0, vec![]).is_empty());
        assert!(run("SELECT 1", -1, vec![]).is_empty());
    }

    #[test]
    fn oversized_driver_count_is_clamped_to_the_text() {
        let params = run(
            "SELECT * FROM t WHERE id = ?",
            i64::MAX,
            vec![Ok("INTEGER".to_string())],
        );
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].resolved_name, "id");
        assert_eq!(params[0].target_type, TargetType::Integer);
    }

    #[test]
    fn unnamed_positions_get_param_n() {
        let params = run(
            "SELECT * FROM t WHERE x IN (SELECT y FROM u WHERE z = ?) AND price BETWEEN ? AND ?",
            3,
            vec![Ok("INT".to_string()), Ok("INT".to_string()), Ok("INT".to_string())],
        );
        let names: Vec<&str> = params.iter().map(|p| p.resolved_name.as_str()).collect();
        assert_eq!(names, vec!["param1", "param2", "param3"]);
    }

    #[test]
    fn empty_sql_is_invalid() {
        let mut source = Source {
            count: 0,
            types: vec![],
        };
        let err = extract("  \n", &mut source, &TypeMapper::new(), &GenericDialect {})
            .expect_err("blank sql");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
