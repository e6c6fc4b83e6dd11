#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use sql2dao::config::GeneratorConfig;
use sql2dao::error::MetadataError;
use sql2dao::metadata::source::{Catalog, CatalogColumn, MetadataSource, ParameterMetadata};
use sql2dao::parser::sql_parser::default_dialect;

pub(crate) fn fixture_dir(fixture: &str) -> PathBuf {
    PathBuf::from("tests/fixtures").join(fixture)
}

pub(crate) fn read_fixture(fixture: &str, file: &str) -> String {
    let path = fixture_dir(fixture).join(file);
    std::fs::read_to_string(path).expect("fixture file should be readable")
}

/// Catalog over the `shop` fixture: DDL tables plus the JSON snapshot.
pub(crate) fn shop_catalog() -> Catalog {
    let mut catalog = Catalog::from_ddl(&read_fixture("shop", "schema.sql"), default_dialect())
        .expect("fixture DDL should parse");
    catalog
        .add_json(&read_fixture("shop", "catalog.json"))
        .expect("fixture catalog should parse");
    catalog
}

pub(crate) fn shop_config() -> GeneratorConfig {
    GeneratorConfig {
        base_package: "com.acme.shop".to_string(),
        ..GeneratorConfig::default()
    }
}

pub(crate) fn column(name: &str, type_name: &str, nullable: bool) -> CatalogColumn {
    CatalogColumn {
        name: name.to_string(),
        type_name: type_name.to_string(),
        nullable,
    }
}

/// Metadata source answering from a fixed script, recording what it was asked.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSource {
    prepare_error: Option<MetadataError>,
    count: Option<i64>,
    types: Vec<Result<String, MetadataError>>,
    tables: BTreeMap<String, Vec<CatalogColumn>>,
    pub(crate) prepared: Vec<String>,
    pub(crate) described: Vec<String>,
}

impl ScriptedSource {
    pub(crate) fn with_types(types: &[&str]) -> Self {
        Self {
            types: types.iter().map(|t| Ok((*t).to_string())).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn failing_prepare(error: MetadataError) -> Self {
        Self {
            prepare_error: Some(error),
            ..Self::default()
        }
    }

    pub(crate) fn with_type_error(mut self, position: usize, message: &str) -> Self {
        self.types[position - 1] = Err(MetadataError::ParameterType {
            position,
            message: message.to_string(),
        });
        self
    }

    pub(crate) fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub(crate) fn with_table(mut self, name: &str, columns: Vec<CatalogColumn>) -> Self {
        self.tables.insert(name.to_string(), columns);
        self
    }
}

struct ScriptedParameters {
    count: i64,
    types: Vec<Result<String, MetadataError>>,
}

impl ParameterMetadata for ScriptedParameters {
    fn parameter_count(&self) -> i64 {
        self.count
    }

    fn parameter_type_name(&self, position: usize) -> Result<String, MetadataError> {
        self.types
            .get(position - 1)
            .cloned()
            .unwrap_or_else(|| Err(MetadataError::ParameterType {
                position,
                message: "not scripted".to_string(),
            }))
    }
}

impl MetadataSource for ScriptedSource {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn ParameterMetadata>, MetadataError> {
        self.prepared.push(sql.to_string());
        if let Some(error) = &self.prepare_error {
            return Err(error.clone());
        }
        let count = self
            .count
            .unwrap_or_else(|| i64::try_from(self.types.len()).expect("small count"));
        Ok(Box::new(ScriptedParameters {
            count,
            types: self.types.clone(),
        }))
    }

    fn table_columns(&mut self, table: &str) -> Result<Vec<CatalogColumn>, MetadataError> {
        self.described.push(table.to_string());
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }
}
