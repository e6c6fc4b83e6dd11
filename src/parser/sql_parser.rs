use sqlparser::ast::Statement;
use sqlparser::dialect::{dialect_from_str, Dialect, GenericDialect};
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Tokenizer};

/// Dialect used when the configuration does not name one.
pub const DEFAULT_DIALECT: &str = "generic";

/// Resolve a `sqlparser` dialect by name (`generic`, `mysql`, `sqlite`, ...).
pub fn dialect_for(name: &str) -> Option<Box<dyn Dialect>> {
    dialect_from_str(name.trim().to_ascii_lowercase())
}

/// Convenience: the generic dialect, which tokenizes `?` as a placeholder.
pub fn default_dialect() -> Box<dyn Dialect> {
    Box::new(GenericDialect {})
}

/// Whether `dialect` tokenizes a bare `?` as a bind placeholder.
///
/// PostgreSQL reads `?` as a JSON operator, so positional SQL cannot be
/// scanned or parsed with it.
pub fn supports_positional_placeholders(dialect: &dyn Dialect) -> bool {
    Tokenizer::new(dialect, "?")
        .tokenize()
        .is_ok_and(|tokens| {
            matches!(tokens.first(), Some(Token::Placeholder(p)) if p.starts_with('?'))
        })
}

/// Parse SQL text into statements with the given dialect.
pub fn parse_statements(dialect: &dyn Dialect, sql: &str) -> Result<Vec<Statement>, ParserError> {
    Parser::parse_sql(dialect, sql)
}

/// Parse exactly one statement, ignoring a trailing semicolon.
pub fn parse_single_statement(dialect: &dyn Dialect, sql: &str) -> Result<Statement, String> {
    let mut statements = parse_statements(dialect, sql).map_err(|e| e.to_string())?;
    match statements.len() {
        0 => Err("no statement found".to_string()),
        1 => Ok(statements.remove(0)),
        n => Err(format!("expected a single statement, found {n}")),
    }
}
