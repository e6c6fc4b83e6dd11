use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::classifier::statement_kind::StatementKind;
use crate::config::GeneratorConfig;
use crate::generator::code_model::{CodeModel, ModelParameter, ParameterStyle};
use crate::mapping::naming::{to_class_name, to_package_segment};
use crate::mapping::type_mapper::TargetType;

const JDBC_TEMPLATE: &str = "org.springframework.jdbc.core.namedparam.NamedParameterJdbcTemplate";
const PARAMETER_SOURCE: &str = "org.springframework.jdbc.core.namedparam.MapSqlParameterSource";
const ROW_MAPPER: &str = "org.springframework.jdbc.core.DataClassRowMapper";
const NULLABLE: &str = "jakarta.annotation.Nullable";
const LIST: &str = "java.util.List";

/// Artifact produced from a code model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ArtifactKind {
    /// Result / request record.
    Dto,
    /// Filter record for SELECT parameters.
    WhereDto,
    /// Data-access object holding the SQL.
    Dao,
    /// Request-handling endpoint.
    Controller,
    /// Wiring of the DAO.
    Config,
}

impl ArtifactKind {
    /// Sub-package the artifact lives in.
    pub fn package_suffix(self) -> &'static str {
        match self {
            ArtifactKind::Dto | ArtifactKind::WhereDto => "dto",
            ArtifactKind::Dao => "dao",
            ArtifactKind::Controller => "controller",
            ArtifactKind::Config => "config",
        }
    }

    /// Class-name suffix appended to the business name.
    pub fn class_suffix(self) -> &'static str {
        match self {
            ArtifactKind::Dto => "Dto",
            ArtifactKind::WhereDto => "WhereDto",
            ArtifactKind::Dao => "Dao",
            ArtifactKind::Controller => "Controller",
            ArtifactKind::Config => "Config",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_suffix())
    }
}

/// A class member variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldShape {
    /// Field name.
    pub name: String,
    /// Field type as written in source.
    pub type_name: String,
    /// Modifiers such as `private static final`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    /// Annotations, each with its leading `@`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    /// Initializer expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initializer: Option<String>,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterShape {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub type_name: String,
    /// Annotations, each with its leading `@`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
}

/// A method with its statement lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodShape {
    /// Method name.
    pub name: String,
    /// Return type.
    pub return_type: String,
    /// Annotations, each with its leading `@`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    /// Parameters in order.
    pub parameters: Vec<ParameterShape>,
    /// Body statements, one per entry.
    pub body: Vec<String>,
}

/// Framework-shaped class handed to the external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassShape {
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Fully-qualified package.
    pub package: String,
    /// Simple class name.
    pub name: String,
    /// Sorted, de-duplicated imports.
    pub imports: Vec<String>,
    /// Class annotations.
    pub annotations: Vec<String>,
    /// Member variables.
    pub fields: Vec<FieldShape>,
    /// Methods.
    pub methods: Vec<MethodShape>,
}

impl ClassShape {
    fn new(kind: ArtifactKind, model: &CodeModel, config: &GeneratorConfig) -> Self {
        Self {
            kind,
            package: package_for(kind, model, config),
            name: class_name(kind, model),
            imports: Vec::new(),
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Fully-qualified class name.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

/// `<base>.<business>.<suffix>` package of an artifact.
pub fn package_for(kind: ArtifactKind, model: &CodeModel, config: &GeneratorConfig) -> String {
    format!(
        "{}.{}.{}",
        config.base_package.trim_end_matches('.'),
        to_package_segment(model.business_domain_name()),
        kind.package_suffix()
    )
}

/// `<Business><Suffix>` class name of an artifact.
pub fn class_name(kind: ArtifactKind, model: &CodeModel) -> String {
    format!(
        "{}{}",
        to_class_name(model.business_domain_name()),
        kind.class_suffix()
    )
}

/// Shapes one artifact from a code model.
pub trait ArtifactEmitter: Send + Sync {
    /// Artifact produced.
    fn kind(&self) -> ArtifactKind;

    /// Emitters with higher priority run first; ties keep registration order.
    fn priority(&self) -> u32 {
        100
    }

    /// Whether this artifact exists for the model.
    fn applies_to(&self, model: &CodeModel, config: &GeneratorConfig) -> bool;

    /// Build the class shape.
    fn emit(&self, model: &CodeModel, config: &GeneratorConfig) -> ClassShape;
}

/// Ordered set of emitters.
pub struct EmitterRegistry {
    emitters: Vec<Box<dyn ArtifactEmitter>>,
}

impl Default for EmitterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitterRegistry {
    /// Registry with the DTO, WHERE-DTO, DAO, controller and config emitters.
    pub fn new() -> Self {
        let mut registry = Self {
            emitters: Vec::new(),
        };
        registry.register(Box::new(DtoEmitter));
        registry.register(Box::new(WhereDtoEmitter));
        registry.register(Box::new(DaoEmitter));
        registry.register(Box::new(ControllerEmitter));
        registry.register(Box::new(ConfigEmitter));
        registry
    }

    /// Registry without emitters.
    pub fn empty() -> Self {
        Self {
            emitters: Vec::new(),
        }
    }

    /// Add an emitter.
    pub fn register(&mut self, emitter: Box<dyn ArtifactEmitter>) {
        self.emitters.push(emitter);
        self.emitters
            .sort_by_key(|e| std::cmp::Reverse(e.priority()));
    }

    /// Run every applicable emitter.
    pub fn emit_all(&self, model: &CodeModel, config: &GeneratorConfig) -> Vec<ClassShape> {
        self.emitters
            .iter()
            .filter(|e| e.applies_to(model, config))
            .map(|e| {
                tracing::debug!(artifact = %e.kind(), "emitting artifact");
                e.emit(model, config)
            })
            .collect()
    }
}

fn type_imports<'a>(types: impl Iterator<Item = TargetType> + 'a) -> impl Iterator<Item = String> + 'a {
    types.filter_map(|t| t.import().map(str::to_string))
}

fn finish_imports(imports: BTreeSet<String>) -> Vec<String> {
    imports.into_iter().collect()
}

fn java_string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for ch in text.chars() {
        match ch {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            other if other.is_control() => {
                literal.push_str(&format!("\\{:03o}", u32::from(other)));
            }
            other => literal.push(other),
        }
    }
    literal.push('"');
    literal
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn has_body(model: &CodeModel) -> bool {
    matches!(
        model.statement_kind(),
        StatementKind::Insert | StatementKind::Update
    )
}

fn uses_where_dto(model: &CodeModel, config: &GeneratorConfig) -> bool {
    config.emit_where_dto
        && model.statement_kind() == StatementKind::Select
        && !model.parameters().is_empty()
}

/// Method parameters of the DAO: the body record first, then each filter.
fn dao_parameters(model: &CodeModel, config: &GeneratorConfig) -> Vec<ParameterShape> {
    if uses_where_dto(model, config) {
        return vec![ParameterShape {
            name: "where".to_string(),
            type_name: class_name(ArtifactKind::WhereDto, model),
            annotations: Vec::new(),
        }];
    }
    let mut parameters = Vec::new();
    if has_body(model) {
        parameters.push(ParameterShape {
            name: "body".to_string(),
            type_name: class_name(ArtifactKind::Dto, model),
            annotations: Vec::new(),
        });
    }
    let loose = model
        .parameters()
        .iter()
        .filter(|p| p.style != ParameterStyle::Body || p.field.is_none());
    parameters.extend(loose.map(|p| ParameterShape {
        name: p.identifier.clone(),
        type_name: p.target_type.to_string(),
        annotations: Vec::new(),
    }));
    parameters
}

fn binding_expression(parameter: &ModelParameter, model: &CodeModel, config: &GeneratorConfig) -> String {
    if uses_where_dto(model, config) {
        return format!("where.{}()", parameter.identifier);
    }
    match (&parameter.style, &parameter.field) {
        (ParameterStyle::Body, Some(field)) => format!("body.{field}()"),
        _ => parameter.identifier.clone(),
    }
}

/// Result/request record.
pub struct DtoEmitter;

impl ArtifactEmitter for DtoEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Dto
    }

    fn applies_to(&self, model: &CodeModel, _config: &GeneratorConfig) -> bool {
        model.statement_kind() != StatementKind::Delete && !model.fields().is_empty()
    }

    fn emit(&self, model: &CodeModel, config: &GeneratorConfig) -> ClassShape {
        let mut class = ClassShape::new(self.kind(), model, config);
        let mut imports: BTreeSet<String> =
            type_imports(model.fields().iter().map(|f| f.target_type)).collect();
        if model.fields().iter().any(|f| f.nullable) {
            imports.insert(NULLABLE.to_string());
        }
        class.imports = finish_imports(imports);
        class.fields = model
            .fields()
            .iter()
            .map(|f| FieldShape {
                name: f.identifier.clone(),
                type_name: f.target_type.to_string(),
                modifiers: vec!["private".to_string()],
                annotations: if f.nullable {
                    vec!["@Nullable".to_string()]
                } else {
                    Vec::new()
                },
                initializer: None,
            })
            .collect();
        class
    }
}

/// Filter record for SELECT parameters.
pub struct WhereDtoEmitter;

impl ArtifactEmitter for WhereDtoEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::WhereDto
    }

    fn applies_to(&self, model: &CodeModel, config: &GeneratorConfig) -> bool {
        uses_where_dto(model, config)
    }

    fn emit(&self, model: &CodeModel, config: &GeneratorConfig) -> ClassShape {
        let mut class = ClassShape::new(self.kind(), model, config);
        class.imports = finish_imports(
            type_imports(model.filter_parameters().map(|p| p.target_type)).collect(),
        );
        class.fields = model
            .filter_parameters()
            .map(|p| FieldShape {
                name: p.identifier.clone(),
                type_name: p.target_type.to_string(),
                modifiers: vec!["private".to_string()],
                annotations: Vec::new(),
                initializer: None,
            })
            .collect();
        class
    }
}

/// Data-access object carrying the rewritten SQL.
pub struct DaoEmitter;

impl DaoEmitter {
    /// DAO method name for the model's statement kind.
    pub fn method_name(model: &CodeModel) -> String {
        let verb = match model.statement_kind() {
            StatementKind::Select | StatementKind::Unknown => "find",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        };
        format!("{verb}{}", to_class_name(model.business_domain_name()))
    }

    fn return_type(model: &CodeModel) -> String {
        match model.statement_kind() {
            StatementKind::Select => format!("List<{}>", class_name(ArtifactKind::Dto, model)),
            _ => "int".to_string(),
        }
    }
}

impl ArtifactEmitter for DaoEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Dao
    }

    fn applies_to(&self, _model: &CodeModel, _config: &GeneratorConfig) -> bool {
        true
    }

    fn emit(&self, model: &CodeModel, config: &GeneratorConfig) -> ClassShape {
        let mut class = ClassShape::new(self.kind(), model, config);
        class.annotations = vec!["@Repository".to_string()];

        let mut imports: BTreeSet<String> = [
            JDBC_TEMPLATE,
            PARAMETER_SOURCE,
            "org.springframework.stereotype.Repository",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        imports.extend(type_imports(model.parameters().iter().map(|p| p.target_type)));
        if model.statement_kind() == StatementKind::Select {
            imports.insert(LIST.to_string());
            imports.insert(ROW_MAPPER.to_string());
        }
        if has_body(model) || model.statement_kind() == StatementKind::Select {
            imports.insert(format!(
                "{}.{}",
                package_for(ArtifactKind::Dto, model, config),
                class_name(ArtifactKind::Dto, model)
            ));
        }
        if uses_where_dto(model, config) {
            imports.insert(format!(
                "{}.{}",
                package_for(ArtifactKind::WhereDto, model, config),
                class_name(ArtifactKind::WhereDto, model)
            ));
        }
        class.imports = finish_imports(imports);

        class.fields = vec![
            FieldShape {
                name: "SQL".to_string(),
                type_name: "String".to_string(),
                modifiers: vec![
                    "private".to_string(),
                    "static".to_string(),
                    "final".to_string(),
                ],
                annotations: Vec::new(),
                initializer: Some(java_string_literal(model.rewritten_sql())),
            },
            FieldShape {
                name: "jdbcTemplate".to_string(),
                type_name: "NamedParameterJdbcTemplate".to_string(),
                modifiers: vec!["private".to_string(), "final".to_string()],
                annotations: Vec::new(),
                initializer: None,
            },
        ];

        let mut body = vec!["MapSqlParameterSource params = new MapSqlParameterSource()".to_string()];
        body.extend(model.parameters().iter().map(|p| {
            format!(
                "params.addValue(\"{}\", {})",
                p.bind_name,
                binding_expression(p, model, config)
            )
        }));
        body.push(match model.statement_kind() {
            StatementKind::Select => format!(
                "return jdbcTemplate.query(SQL, params, DataClassRowMapper.newInstance({}.class))",
                class_name(ArtifactKind::Dto, model)
            ),
            _ => "return jdbcTemplate.update(SQL, params)".to_string(),
        });

        class.methods = vec![MethodShape {
            name: Self::method_name(model),
            return_type: Self::return_type(model),
            annotations: Vec::new(),
            parameters: dao_parameters(model, config),
            body,
        }];
        class
    }
}

/// Request-handling endpoint delegating to the DAO.
pub struct ControllerEmitter;

impl ControllerEmitter {
    /// HTTP method annotation for the statement kind.
    pub fn mapping_annotation(kind: StatementKind) -> &'static str {
        match kind {
            StatementKind::Select | StatementKind::Unknown => "GetMapping",
            StatementKind::Insert => "PostMapping",
            StatementKind::Update => "PutMapping",
            StatementKind::Delete => "DeleteMapping",
        }
    }

    /// Route of the endpoint, with `/{name}` for a path parameter.
    pub fn route(model: &CodeModel, config: &GeneratorConfig) -> String {
        let mut route = format!(
            "{}/{}",
            config.route_prefix(),
            to_package_segment(model.business_domain_name())
        );
        if let Some(path) = model.parameters_with_style(ParameterStyle::Path).next() {
            route.push_str(&format!("/{{{}}}", path.identifier));
        }
        route
    }
}

impl ArtifactEmitter for ControllerEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Controller
    }

    fn applies_to(&self, _model: &CodeModel, _config: &GeneratorConfig) -> bool {
        true
    }

    fn emit(&self, model: &CodeModel, config: &GeneratorConfig) -> ClassShape {
        let mut class = ClassShape::new(self.kind(), model, config);
        let dao = class_name(ArtifactKind::Dao, model);
        let mapping = Self::mapping_annotation(model.statement_kind());
        class.annotations = vec!["@RestController".to_string()];

        let mut imports: BTreeSet<String> = [
            "org.springframework.web.bind.annotation.RestController".to_string(),
            format!("org.springframework.web.bind.annotation.{mapping}"),
            format!("{}.{dao}", package_for(ArtifactKind::Dao, model, config)),
        ]
        .into_iter()
        .collect();

        let mut parameters = Vec::new();
        let mut arguments = Vec::new();
        let where_dto = uses_where_dto(model, config);
        if has_body(model) {
            imports.insert("org.springframework.web.bind.annotation.RequestBody".to_string());
            imports.insert(format!(
                "{}.{}",
                package_for(ArtifactKind::Dto, model, config),
                class_name(ArtifactKind::Dto, model)
            ));
            parameters.push(ParameterShape {
                name: "body".to_string(),
                type_name: class_name(ArtifactKind::Dto, model),
                annotations: vec!["@RequestBody".to_string()],
            });
            arguments.push("body".to_string());
        }
        for parameter in model.parameters() {
            let annotation = match parameter.style {
                ParameterStyle::Path => "PathVariable",
                ParameterStyle::Query => "RequestParam",
                ParameterStyle::Body if parameter.field.is_some() => continue,
                ParameterStyle::Body => "RequestParam",
            };
            imports.insert(format!("org.springframework.web.bind.annotation.{annotation}"));
            imports.extend(parameter.target_type.import().map(str::to_string));
            parameters.push(ParameterShape {
                name: parameter.identifier.clone(),
                type_name: parameter.target_type.to_string(),
                annotations: vec![format!("@{annotation}(\"{}\")", parameter.identifier)],
            });
            if !where_dto {
                arguments.push(parameter.identifier.clone());
            }
        }

        let mut body = Vec::new();
        if where_dto {
            let where_class = class_name(ArtifactKind::WhereDto, model);
            imports.insert(format!(
                "{}.{where_class}",
                package_for(ArtifactKind::WhereDto, model, config)
            ));
            let values: Vec<&str> = model.parameters().iter().map(|p| p.identifier.as_str()).collect();
            body.push(format!(
                "{where_class} where = new {where_class}({})",
                values.join(", ")
            ));
            arguments.push("where".to_string());
        }
        if model.statement_kind() == StatementKind::Select {
            imports.insert(LIST.to_string());
            imports.insert(format!(
                "{}.{}",
                package_for(ArtifactKind::Dto, model, config),
                class_name(ArtifactKind::Dto, model)
            ));
        }
        body.push(format!(
            "return {}.{}({})",
            lower_first(&dao),
            DaoEmitter::method_name(model),
            arguments.join(", ")
        ));

        class.imports = finish_imports(imports);
        class.fields = vec![FieldShape {
            name: lower_first(&dao),
            type_name: dao,
            modifiers: vec!["private".to_string(), "final".to_string()],
            annotations: Vec::new(),
            initializer: None,
        }];
        class.methods = vec![MethodShape {
            name: DaoEmitter::method_name(model),
            return_type: DaoEmitter::return_type(model),
            annotations: vec![format!("@{mapping}(\"{}\")", Self::route(model, config))],
            parameters,
            body,
        }];
        class
    }
}

/// Bean wiring of the DAO.
pub struct ConfigEmitter;

impl ArtifactEmitter for ConfigEmitter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Config
    }

    fn applies_to(&self, _model: &CodeModel, _config: &GeneratorConfig) -> bool {
        true
    }

    fn emit(&self, model: &CodeModel, config: &GeneratorConfig) -> ClassShape {
        let mut class = ClassShape::new(self.kind(), model, config);
        let dao = class_name(ArtifactKind::Dao, model);
        class.annotations = vec!["@Configuration".to_string()];
        class.imports = finish_imports(
            [
                "org.springframework.context.annotation.Bean".to_string(),
                "org.springframework.context.annotation.Configuration".to_string(),
                JDBC_TEMPLATE.to_string(),
                format!("{}.{dao}", package_for(ArtifactKind::Dao, model, config)),
            ]
            .into_iter()
            .collect(),
        );
        class.methods = vec![MethodShape {
            name: lower_first(&dao),
            return_type: dao.clone(),
            annotations: vec!["@Bean".to_string()],
            parameters: vec![ParameterShape {
                name: "jdbcTemplate".to_string(),
                type_name: "NamedParameterJdbcTemplate".to_string(),
                annotations: Vec::new(),
            }],
            body: vec![format!("return new {dao}(jdbcTemplate)")],
        }];
        class
    }
}
