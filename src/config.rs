use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlparser::dialect::Dialect;

use crate::error::{Error, Result};
use crate::mapping::type_mapper::TypeMapper;
use crate::parser::sql_parser::{dialect_for, supports_positional_placeholders, DEFAULT_DIALECT};

/// Settings shared by every generation request.
///
/// ```toml
/// base_package = "com.acme.shop"
/// dialect = "mysql"
/// api_prefix = "/v1"
/// emit_where_dto = false
///
/// [type_overrides]
/// NUMBER = "Long"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Package prefix of generated classes.
    pub base_package: String,

    /// `sqlparser` dialect name used for parsing and tokenizing.
    pub dialect: String,

    /// Route prefix of generated controllers.
    pub api_prefix: String,

    /// Emit a WHERE-DTO for SELECT statements with parameters.
    pub emit_where_dto: bool,

    /// Source type name -> target type name, applied on top of the built-in table.
    pub type_overrides: BTreeMap<String, String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_package: "com.example".to_string(),
            dialect: DEFAULT_DIALECT.to_string(),
            api_prefix: "/api".to_string(),
            emit_where_dto: true,
            type_overrides: BTreeMap::new(),
        }
    }
}

impl GeneratorConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<()> {
        self.sql_dialect()?;
        self.type_mapper()?;
        if self.base_package.trim().is_empty() {
            return Err(Error::Config("base_package must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the configured dialect. Dialects that do not read `?` as a
    /// bind placeholder are rejected.
    pub fn sql_dialect(&self) -> Result<Box<dyn Dialect>> {
        let dialect = dialect_for(&self.dialect)
            .ok_or_else(|| Error::Config(format!("unknown SQL dialect '{}'", self.dialect)))?;
        if !supports_positional_placeholders(dialect.as_ref()) {
            return Err(Error::Config(format!(
                "SQL dialect '{}' does not tokenize `?` as a bind placeholder",
                self.dialect
            )));
        }
        Ok(dialect)
    }

    /// Build the type mapper with the configured overrides.
    pub fn type_mapper(&self) -> Result<TypeMapper> {
        TypeMapper::with_overrides(&self.type_overrides)
    }

    /// Controller route prefix without a trailing slash.
    pub fn route_prefix(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::type_mapper::TargetType;

    #[test]
    fn empty_document_yields_defaults() {
        let config = GeneratorConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.base_package, "com.example");
        assert!(config.emit_where_dto);
    }

    #[test]
    fn overrides_feed_the_type_mapper() {
        let config = GeneratorConfig::from_toml_str(
            r#"
base_package = "com.acme"
dialect = "MySQL"

[type_overrides]
"NUMBER" = "Long"
"#,
        )
        .expect("valid config");
        let mapper = config.type_mapper().expect("mapper");
        assert_eq!(mapper.target_type_for("number").unwrap(), TargetType::Long);
        assert!(config.sql_dialect().is_ok());
    }

    #[test]
    fn unknown_dialect_and_target_type_are_config_errors() {
        let err = GeneratorConfig::from_toml_str("dialect = \"cobol\"").unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("cobol")));

        let err = GeneratorConfig::from_toml_str("[type_overrides]\nx = \"Polygon\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn dialect_without_question_mark_placeholders_is_rejected() {
        let err = GeneratorConfig::from_toml_str("dialect = \"postgresql\"").unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("does not tokenize")));

        let config = GeneratorConfig {
            dialect: "postgresql".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(config.sql_dialect().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = GeneratorConfig::from_toml_str("basepackage = \"x\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn route_prefix_drops_trailing_slash() {
        let config = GeneratorConfig {
            api_prefix: "/api/".to_string(),
            ..GeneratorConfig::default()
        };
        assert_eq!(config.route_prefix(), "/api");
    }
}
