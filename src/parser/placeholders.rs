//! The scan works on `sqlparser` tokens rather than the AST so that it keeps
//! working on statements the parser rejects (vendor extensions, partial SQL).
//! Each placeholder is reported with its 1-based ordinal, the clause it sits
//! in, and, when the surrounding text allows it, the column it binds to.
//! The same pass records the DML target table, the `SET` columns and the
//! columns tested in the top-level `WHERE` clause.

use serde::Serialize;
use sqlparser::dialect::Dialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, TokenizerError};

use crate::parser::expr::ColumnRef;
use crate::parser::names::is_simple_identifier;

/// Clause a placeholder appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Clause {
    /// SELECT list.
    Projection,
    /// FROM / JOIN table list.
    From,
    /// UPDATE ... SET assignments.
    Set,
    /// INSERT ... VALUES rows.
    Values,
    /// WHERE predicate.
    Where,
    /// Anything else (ON, GROUP BY, HAVING, ORDER BY, LIMIT, ...).
    Other,
}

/// One positional placeholder found in SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSite {
    /// 1-based position in textual order.
    pub ordinal: usize,
    /// Clause containing the placeholder.
    pub clause: Clause,
    /// `true` when the placeholder sits inside a nested SELECT.
    pub in_subquery: bool,
    /// Column bound by `column <op> ?` or by an INSERT VALUES position.
    pub column: Option<ColumnRef>,
    /// 0-based position inside a VALUES row when the placeholder is a whole
    /// row item.
    pub value_index: Option<usize>,
}

impl PlaceholderSite {
    /// Column bound in the top-level WHERE clause, if any.
    pub fn where_column(&self) -> Option<&ColumnRef> {
        if self.clause == Clause::Where && !self.in_subquery {
            self.column.as_ref()
        } else {
            None
        }
    }
}

/// Result of scanning one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderScan {
    /// Placeholders in textual order.
    pub sites: Vec<PlaceholderSite>,
    /// Table named by `INSERT INTO`, `UPDATE` or `DELETE FROM`.
    pub target_table: Option<String>,
    /// Explicit INSERT column list, empty when absent.
    pub insert_columns: Vec<String>,
    /// Columns assigned in a top-level `SET` list, in order.
    pub set_columns: Vec<String>,
    /// Distinct columns tested in the top-level WHERE clause, in order.
    pub where_columns: Vec<ColumnRef>,
}

impl PlaceholderScan {
    /// Number of positional placeholders.
    pub fn count(&self) -> usize {
        self.sites.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    clause: Clause,
    subquery: bool,
    values_row: bool,
    insert_column_list: bool,
    item_index: usize,
}

impl Frame {
    fn root() -> Self {
        Self {
            clause: Clause::Other,
            subquery: false,
            values_row: false,
            insert_column_list: false,
            item_index: 0,
        }
    }

    fn child_of(parent: &Frame) -> Self {
        Self {
            clause: parent.clause,
            subquery: parent.subquery,
            values_row: false,
            insert_column_list: false,
            item_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetState {
    Idle,
    Expect,
    Reading,
    AfterDot,
    Done,
}

/// Returns `true` for a positional placeholder token (`?` or `?NNN`).
fn is_positional(token: &Token) -> bool {
    matches!(token, Token::Placeholder(p) if p.starts_with('?'))
}

fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.keyword == keyword)
}

fn is_comparison(token: &Token) -> bool {
    match token {
        Token::Eq | Token::DoubleEq | Token::Neq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => {
            true
        }
        Token::Word(w) => {
            w.quote_style.is_none() && matches!(w.keyword, Keyword::LIKE | Keyword::ILIKE)
        }
        _ => false,
    }
}

/// Comparison operators plus the predicate keywords that test a column
/// without binding a single value (`IN`, `BETWEEN`, `IS`).
fn is_predicate_operator(token: &Token) -> bool {
    is_comparison(token)
        || is_keyword(token, Keyword::IN)
        || is_keyword(token, Keyword::BETWEEN)
        || is_keyword(token, Keyword::IS)
}

fn bare_identifier(token: &Token) -> Option<&str> {
    match token {
        Token::Word(w) if w.quote_style.is_none() && is_simple_identifier(&w.value) => {
            Some(w.value.as_str())
        }
        _ => None,
    }
}

/// Quoted identifiers count as columns here; unquoted ones must be simple.
fn any_identifier(token: &Token) -> Option<&str> {
    match token {
        Token::Word(w) if w.quote_style.is_some() => Some(w.value.as_str()),
        other => bare_identifier(other),
    }
}

/// Read `[qualifier .] column` at the end of `history`.
fn column_before<'a>(
    history: &'a [Token],
    ident: fn(&Token) -> Option<&str>,
) -> Option<(ColumnRef, &'a [Token])> {
    let (column_token, rest) = history.split_last()?;
    let column = ident(column_token)?.to_string();
    match rest {
        [before @ .., qualifier, Token::Period] => Some((
            ColumnRef {
                qualifier: Some(ident(qualifier)?.to_string()),
                column,
            },
            before,
        )),
        _ => Some((
            ColumnRef {
                qualifier: None,
                column,
            },
            rest,
        )),
    }
}

/// Resolve `[qualifier .] column <op>` immediately before a placeholder.
fn comparison_target(history: &[Token]) -> Option<ColumnRef> {
    let (op, rest) = history.split_last()?;
    if !is_comparison(op) {
        return None;
    }
    column_before(rest, bare_identifier).map(|(column, _)| column)
}

/// Column tested by the predicate operator that is about to be pushed.
fn predicate_subject(history: &[Token]) -> Option<ColumnRef> {
    let history = match history.split_last() {
        Some((last, rest)) if is_keyword(last, Keyword::NOT) => rest,
        _ => history,
    };
    column_before(history, any_identifier).map(|(column, _)| column)
}

/// Column on the left of a top-level `SET col = ...` assignment.
fn assignment_target(history: &[Token]) -> Option<String> {
    let (column, before) = column_before(history, any_identifier)?;
    match before.last() {
        Some(Token::Comma) => Some(column.column),
        Some(token) if is_keyword(token, Keyword::SET) => Some(column.column),
        _ => None,
    }
}

fn tokenize(dialect: &dyn Dialect, sql: &str) -> Result<Vec<Token>, TokenizerError> {
    Tokenizer::new(dialect, sql).tokenize()
}

/// Scan `sql` for positional placeholders and DML column lists.
pub fn scan_placeholders(dialect: &dyn Dialect, sql: &str) -> Result<PlaceholderScan, TokenizerError> {
    let tokens = tokenize(dialect, sql)?;
    let mut frames = vec![Frame::root()];
    let mut history: Vec<Token> = Vec::new();
    let mut scan = PlaceholderScan::default();
    let mut insert_pending = false;
    let mut delete_pending = false;
    let mut target = TargetState::Idle;
    let mut target_parts: Vec<String> = Vec::new();

    for token in tokens {
        if matches!(token, Token::Whitespace(_) | Token::EOF) {
            continue;
        }

        match (target, &token) {
            (TargetState::Expect | TargetState::AfterDot, Token::Word(w)) => {
                target_parts.push(w.value.clone());
                target = TargetState::Reading;
                history.push(token);
                continue;
            }
            (TargetState::Reading, Token::Period) => {
                target = TargetState::AfterDot;
                history.push(token);
                continue;
            }
            (TargetState::Reading | TargetState::AfterDot, _) => {
                target = TargetState::Done;
                scan.target_table = Some(target_parts.join("."));
            }
            _ => {}
        }

        let depth = frames.len();
        let top = &mut frames[depth - 1];
        let top_level = depth == 1 && !top.subquery;

        match &token {
            Token::Word(w) if top.insert_column_list => {
                scan.insert_columns.push(w.value.clone());
            }
            Token::Word(w) if w.quote_style.is_none() => match w.keyword {
                Keyword::SELECT => {
                    if depth > 1 {
                        top.subquery = true;
                    }
                    top.clause = Clause::Projection;
                    insert_pending = false;
                }
                Keyword::INSERT if depth == 1 => insert_pending = true,
                Keyword::INTO if insert_pending && target == TargetState::Idle => {
                    target = TargetState::Expect;
                }
                Keyword::UPDATE if depth == 1 && target == TargetState::Idle => {
                    target = TargetState::Expect;
                }
                Keyword::DELETE if depth == 1 => delete_pending = true,
                Keyword::FROM | Keyword::JOIN => {
                    if delete_pending && target == TargetState::Idle {
                        target = TargetState::Expect;
                    }
                    delete_pending = false;
                    top.clause = Clause::From;
                }
                Keyword::SET => top.clause = Clause::Set,
                Keyword::VALUES => {
                    top.clause = Clause::Values;
                    insert_pending = false;
                }
                Keyword::WHERE => top.clause = Clause::Where,
                Keyword::ON
                | Keyword::GROUP
                | Keyword::ORDER
                | Keyword::HAVING
                | Keyword::LIMIT
                | Keyword::OFFSET
                | Keyword::RETURNING
                | Keyword::UNION => top.clause = Clause::Other,
                _ => {}
            },
            Token::LParen => {
                let mut frame = Frame::child_of(top);
                if depth == 1 && insert_pending {
                    frame.insert_column_list = true;
                    insert_pending = false;
                } else if top.clause == Clause::Values && !top.values_row {
                    frame.values_row = true;
                }
                frames.push(frame);
            }
            Token::RParen => {
                if frames.len() > 1 {
                    frames.pop();
                }
            }
            Token::Comma if top.values_row => top.item_index += 1,
            Token::Eq if top_level && top.clause == Clause::Set => {
                if let Some(column) = assignment_target(&history) {
                    scan.set_columns.push(column);
                }
            }
            t if is_positional(t) => {
                let directly_in_row = top.values_row
                    && matches!(history.last(), Some(Token::LParen | Token::Comma));
                let value_index = directly_in_row.then_some(top.item_index);
                let column = match value_index {
                    Some(index) => scan.insert_columns.get(index).map(|column| ColumnRef {
                        qualifier: None,
                        column: column.clone(),
                    }),
                    None => comparison_target(&history),
                };
                scan.sites.push(PlaceholderSite {
                    ordinal: scan.sites.len() + 1,
                    clause: top.clause,
                    in_subquery: top.subquery,
                    column,
                    value_index,
                });
            }
            _ => {}
        }

        let in_where = frames[frames.len() - 1].clause == Clause::Where
            && !frames[frames.len() - 1].subquery;
        if in_where && is_predicate_operator(&token) {
            if let Some(column) = predicate_subject(&history) {
                let seen = scan.where_columns.iter().any(|c| {
                    c.column.eq_ignore_ascii_case(&column.column) && c.qualifier == column.qualifier
                });
                if !seen {
                    scan.where_columns.push(column);
                }
            }
        }

        history.push(token);
    }

    if matches!(target, TargetState::Reading | TargetState::AfterDot) {
        scan.target_table = Some(target_parts.join("."));
    }

    Ok(scan)
}

/// Replace each positional placeholder, in order, with `:<name>`.
///
/// Token order is preserved exactly; whitespace and comments are re-emitted
/// from the token stream, so formatting survives up to literal re-quoting.
pub fn rewrite_placeholders(
    dialect: &dyn Dialect,
    sql: &str,
    names: &[String],
) -> Result<String, String> {
    let tokens = tokenize(dialect, sql).map_err(|e| e.to_string())?;
    let mut names_iter = names.iter();
    let mut rewritten = String::with_capacity(sql.len() + names.len() * 8);

    for token in tokens {
        if is_positional(&token) {
            let name = names_iter
                .next()
                .ok_or_else(|| format!("more placeholders than the {} names supplied", names.len()))?;
            rewritten.push(':');
            rewritten.push_str(name);
        } else {
            rewritten.push_str(&token.to_string());
        }
    }

    if names_iter.next().is_some() {
        return Err(format!(
            "{} names supplied for fewer placeholders",
            names.len()
        ));
    }
    Ok(rewritten)
}

/// Ordered named placeholders (`:name`) found in SQL text.
///
/// Used to check that a rewritten statement still binds the same parameters
/// in the same order as its positional source.
pub fn named_placeholders(dialect: &dyn Dialect, sql: &str) -> Result<Vec<String>, TokenizerError> {
    let tokens = tokenize(dialect, sql)?;
    let mut names = Vec::new();
    let mut previous_colon = false;
    for token in tokens {
        match &token {
            Token::Placeholder(p) if p.starts_with(':') => names.push(p[1..].to_string()),
            Token::Word(w) if previous_colon => names.push(w.value.clone()),
            _ => {}
        }
        previous_colon = matches!(token, Token::Colon);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::GenericDialect;

    fn scan(sql: &str) -> PlaceholderScan {
        scan_placeholders(&GenericDialect {}, sql).expect("sql should tokenize")
    }

    fn column(site: &PlaceholderSite) -> Option<&str> {
        site.column.as_ref().map(|c| c.column.as_str())
    }

    #[test]
    fn where_comparisons_bind_columns_in_order() {
        let result = scan("SELECT * FROM customers WHERE customer_id = ? AND status <> ?");
        assert_eq!(result.count(), 2);
        assert_eq!(result.sites[0].ordinal, 1);
        assert_eq!(result.sites[0].clause, Clause::Where);
        assert_eq!(column(&result.sites[0]), Some("customer_id"));
        assert_eq!(column(&result.sites[1]), Some("status"));
    }

    #[test]
    fn alias_qualified_reference_keeps_qualifier() {
        let result = scan("SELECT c.name FROM customers c WHERE c.customer_id >= ?");
        let bound = result.sites[0].where_column().expect("bound column");
        assert_eq!(bound.qualifier.as_deref(), Some("c"));
        assert_eq!(bound.column, "customer_id");
    }

    #[test]
    fn subquery_placeholders_are_flagged() {
        let result = scan(
            "SELECT * FROM orders WHERE customer_id IN (SELECT id FROM customers WHERE region = ?) AND total > ?",
        );
        assert_eq!(result.count(), 2);
        assert!(result.sites[0].in_subquery);
        assert!(result.sites[0].where_column().is_none());
        assert!(!result.sites[1].in_subquery);
        assert_eq!(column(&result.sites[1]), Some("total"));
    }

    #[test]
    fn parenthesized_predicates_stay_in_where() {
        let result = scan("DELETE FROM t WHERE (a = ? OR b = ?)");
        assert_eq!(result.sites[0].where_column().map(|c| c.column.as_str()), Some("a"));
        assert_eq!(result.sites[1].where_column().map(|c| c.column.as_str()), Some("b"));
    }

    #[test]
    fn insert_values_map_to_column_list() {
        let result = scan("INSERT INTO customers (customer_id, name, created_at) VALUES (?, ?, NOW())");
        assert_eq!(result.insert_columns, vec!["customer_id", "name", "created_at"]);
        assert_eq!(result.count(), 2);
        assert_eq!(result.sites[0].clause, Clause::Values);
        assert_eq!(column(&result.sites[0]), Some("customer_id"));
        assert_eq!(column(&result.sites[1]), Some("name"));
    }

    #[test]
    fn update_set_and_where_sites() {
        let result = scan("UPDATE customers SET name = ?, status = ? WHERE customer_id = ?");
        let clauses: Vec<Clause> = result.sites.iter().map(|s| s.clause).collect();
        assert_eq!(clauses, vec![Clause::Set, Clause::Set, Clause::Where]);
        assert_eq!(column(&result.sites[2]), Some("customer_id"));
    }

    #[test]
    fn quoted_and_literal_question_marks_are_ignored_or_unbound() {
        let result = scan("SELECT * FROM t WHERE note = '?' AND \"odd-col\" = ?");
        assert_eq!(result.count(), 1);
        assert!(result.sites[0].column.is_none());
    }

    #[test]
    fn between_placeholders_are_unbound() {
        let result = scan("SELECT * FROM t WHERE price BETWEEN ? AND ?");
        assert_eq!(result.count(), 2);
        assert!(result.sites.iter().all(|s| s.column.is_none()));
    }

    #[test]
    fn dml_target_table_is_recorded() {
        assert_eq!(
            scan("INSERT INTO sales.orders (id) VALUES (?)").target_table.as_deref(),
            Some("sales.orders")
        );
        assert_eq!(
            scan("UPDATE customers c SET name = ? WHERE c.id = ?").target_table.as_deref(),
            Some("customers")
        );
        assert_eq!(
            scan("DELETE FROM customers WHERE id = ?").target_table.as_deref(),
            Some("customers")
        );
        assert_eq!(scan("SELECT * FROM customers").target_table, None);
    }

    #[test]
    fn set_columns_skip_nested_comparisons() {
        let result = scan(
            "UPDATE t SET a = ?, b = CASE WHEN c = 1 THEN 2 ELSE 3 END, \"D\" = (x = 1) WHERE id = ?",
        );
        assert_eq!(result.set_columns, vec!["a", "b", "D"]);
    }

    #[test]
    fn where_columns_include_literals_and_predicates() {
        let result = scan(
            "DELETE FROM t WHERE id = 5 AND t.region IN (1, 2) AND deleted_at IS NULL AND name NOT LIKE ? AND id > ?",
        );
        let columns: Vec<(Option<&str>, &str)> = result
            .where_columns
            .iter()
            .map(|c| (c.qualifier.as_deref(), c.column.as_str()))
            .collect();
        assert_eq!(
            columns,
            vec![
                (None, "id"),
                (Some("t"), "region"),
                (None, "deleted_at"),
                (None, "name"),
            ]
        );
    }

    #[test]
    fn where_columns_ignore_subqueries() {
        let result = scan(
            "SELECT * FROM orders WHERE customer_id IN (SELECT id FROM customers WHERE region = ?)",
        );
        assert_eq!(result.where_columns.len(), 1);
        assert_eq!(result.where_columns[0].column, "customer_id");
    }

    #[test]
    fn values_without_column_list_report_row_positions() {
        let result = scan("INSERT INTO t VALUES (?, 'x', ?)");
        let positions: Vec<Option<usize>> = result.sites.iter().map(|s| s.value_index).collect();
        assert_eq!(positions, vec![Some(0), Some(2)]);
        assert!(result.sites.iter().all(|s| s.column.is_none()));
    }

    #[test]
    fn rewrite_preserves_token_order() {
        let rewritten = rewrite_placeholders(
            &GenericDialect {},
            "SELECT * FROM customers WHERE customer_id = ? AND status = ?",
            &["customerId".to_string(), "status".to_string()],
        )
        .expect("rewrite should succeed");
        assert_eq!(
            rewritten,
            "SELECT * FROM customers WHERE customer_id = :customerId AND status = :status"
        );
    }

    #[test]
    fn rewrite_rejects_name_count_mismatch() {
        let err = rewrite_placeholders(&GenericDialect {}, "SELECT ? , ?", &["a".to_string()])
            .expect_err("too few names");
        assert!(err.contains("more placeholders"));
        let err = rewrite_placeholders(
            &GenericDialect {},
            "SELECT ?",
            &["a".to_string(), "b".to_string()],
        )
        .expect_err("too many names");
        assert!(err.contains("fewer placeholders"));
    }
}
