/// SQL expression helpers: column references, cast types, function names.
pub mod expr;
/// Identifier and table-name normalization helpers (schema-qualified names, quoted identifiers).
pub mod names;
/// Token-level positional placeholder scanning and named-placeholder rewriting.
pub mod placeholders;
/// `CREATE TABLE` parsing into per-table column lists.
pub mod schema;
/// Thin wrapper around `sqlparser` for dialect selection and statement parsing.
pub mod sql_parser;
