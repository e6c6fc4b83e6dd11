use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};

use crate::parser::names::{normalize_identifier, normalize_relation_name};

/// A table visible in a statement's FROM/JOIN list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScope {
    /// Table name as written (possibly schema-qualified).
    pub name: String,
    /// Alias, if one was given.
    pub alias: Option<String>,
}

impl TableScope {
    /// Whether a column qualifier refers to this table.
    ///
    /// An aliased table answers to its alias and to its bare relation name.
    pub fn answers_to(&self, qualifier: &str) -> bool {
        let qualifier = normalize_identifier(qualifier);
        if let Some(alias) = &self.alias {
            if normalize_identifier(alias) == qualifier {
                return true;
            }
        }
        normalize_relation_name(&self.name) == qualifier
    }

    /// Name used for `owning_table`: the relation without schema.
    pub fn relation(&self) -> String {
        normalize_relation_name(&self.name)
    }
}

/// The outermost SELECT of a query, following nested parentheses and the
/// left arm of set operations.
pub fn primary_select(query: &Query) -> Option<&Select> {
    fn walk(body: &SetExpr) -> Option<&Select> {
        match body {
            SetExpr::Select(select) => Some(select.as_ref()),
            SetExpr::Query(query) => walk(&query.body),
            SetExpr::SetOperation { left, .. } => walk(left),
            _ => None,
        }
    }
    walk(&query.body)
}

/// Tables named in the FROM/JOIN list of the statement's primary SELECT.
///
/// DML statements report no scope here; their single target table comes
/// from the token scan.
pub fn table_scope(statement: &Statement) -> Vec<TableScope> {
    match statement {
        Statement::Query(query) => primary_select(query)
            .map(|select| from_tables(&select.from))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Flatten `FROM a JOIN b ...` into scope entries in textual order.
pub fn from_tables(from: &[TableWithJoins]) -> Vec<TableScope> {
    let mut scope = Vec::new();
    for table in from {
        push_factor(&table.relation, &mut scope);
        for join in &table.joins {
            push_factor(&join.relation, &mut scope);
        }
    }
    scope
}

fn push_factor(factor: &TableFactor, scope: &mut Vec<TableScope>) {
    match factor {
        TableFactor::Table { name, alias, .. } => scope.push(TableScope {
            name: name.to_string(),
            alias: alias.as_ref().map(|a| a.name.value.clone()),
        }),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => scope.extend(from_tables(std::slice::from_ref(table_with_joins.as_ref()))),
        _ => {}
    }
}
