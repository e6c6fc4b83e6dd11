use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::generator::code_model::{self, CodeModel};
use crate::generator::emitters::{ClassShape, EmitterRegistry};
use crate::mapping::naming::validate_business_name;
use crate::metadata::analyzer::analyze;
use crate::metadata::source::MetadataSource;
use crate::metadata::statement::StatementMetadata;

/// Everything produced for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    /// Resolved statement metadata.
    pub metadata: StatementMetadata,
    /// The code model built from it.
    pub model: CodeModel,
    /// Emitted class shapes in registry order.
    pub artifacts: Vec<ClassShape>,
}

/// Run the pipeline with the default emitters.
pub fn generate(
    sql: &str,
    business_domain_name: &str,
    source: &mut dyn MetadataSource,
    config: &GeneratorConfig,
) -> Result<Generation> {
    generate_with(sql, business_domain_name, source, config, &EmitterRegistry::new())
}

/// Run the pipeline with a caller-supplied emitter registry.
///
/// The business name is validated before any metadata is requested.
pub fn generate_with(
    sql: &str,
    business_domain_name: &str,
    source: &mut dyn MetadataSource,
    config: &GeneratorConfig,
    emitters: &EmitterRegistry,
) -> Result<Generation> {
    validate_business_name(business_domain_name)?;
    let dialect = config.sql_dialect()?;
    let mapper = config.type_mapper()?;

    let metadata = analyze(sql, source, &mapper, dialect.as_ref())?;
    let model = code_model::build(&metadata, business_domain_name, &mapper, dialect.as_ref())?;
    let artifacts = emitters.emit_all(&model, config);
    tracing::info!(
        business = business_domain_name,
        kind = %model.statement_kind(),
        fields = model.fields().len(),
        parameters = model.parameters().len(),
        artifacts = artifacts.len(),
        "generation complete"
    );

    Ok(Generation {
        metadata,
        model,
        artifacts,
    })
}
