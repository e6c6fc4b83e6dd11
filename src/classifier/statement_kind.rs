use serde::{Deserialize, Serialize};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::Dialect;
use std::fmt;

use crate::parser::sql_parser::parse_statements;

/// The kind of DML statement a generation request is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    /// `SELECT` (including `WITH ... SELECT`).
    Select,
    /// `INSERT`.
    Insert,
    /// `UPDATE`.
    Update,
    /// `DELETE`.
    Delete,
    /// Anything else: DDL, empty input, unrecognized text.
    Unknown,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
            StatementKind::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for StatementKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SELECT" => Ok(StatementKind::Select),
            "INSERT" => Ok(StatementKind::Insert),
            "UPDATE" => Ok(StatementKind::Update),
            "DELETE" => Ok(StatementKind::Delete),
            "UNKNOWN" => Ok(StatementKind::Unknown),
            _ => Err(format!("Invalid statement kind: {s}")),
        }
    }
}

impl From<&Statement> for StatementKind {
    fn from(statement: &Statement) -> Self {
        match statement {
            Statement::Query(query) => match query.body.as_ref() {
                SetExpr::Select(_) | SetExpr::Query(_) | SetExpr::SetOperation { .. } => {
                    StatementKind::Select
                }
                SetExpr::Insert(_) => StatementKind::Insert,
                SetExpr::Update(_) => StatementKind::Update,
                SetExpr::Delete(_) => StatementKind::Delete,
                _ => StatementKind::Unknown,
            },
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update { .. } => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
            _ => StatementKind::Unknown,
        }
    }
}

impl StatementKind {
    /// Whether the statement writes rows.
    pub fn is_dml_write(self) -> bool {
        matches!(
            self,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }
}

/// Classify raw SQL text.
///
/// Tries a structural parse first and only falls back to keyword-prefix
/// matching when the parser rejects the text. Empty input is `Unknown`.
pub fn classify(dialect: &dyn Dialect, sql: &str) -> StatementKind {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return StatementKind::Unknown;
    }

    match parse_statements(dialect, trimmed) {
        Ok(statements) => match statements.first() {
            Some(statement) => StatementKind::from(statement),
            None => StatementKind::Unknown,
        },
        Err(err) => {
            let kind = classify_by_keyword(trimmed);
            tracing::debug!(
                error = %err,
                fallback = %kind,
                "structural parse failed; classified by leading keyword"
            );
            kind
        }
    }
}

/// Case-insensitive leading-keyword classification used when parsing fails.
pub fn classify_by_keyword(sql: &str) -> StatementKind {
    let first_word: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    match first_word.to_ascii_uppercase().as_str() {
        "SELECT" | "WITH" => StatementKind::Select,
        "INSERT" => StatementKind::Insert,
        "UPDATE" => StatementKind::Update,
        "DELETE" => StatementKind::Delete,
        _ => StatementKind::Unknown,
    }
}
