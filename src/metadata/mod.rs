/// Pipeline driver: SQL plus a metadata source to one statement shape.
pub mod analyzer;
/// SELECT projection and DML column resolution against table schemas.
pub mod columns;
/// Bind-parameter extraction: driver types plus WHERE-derived names.
pub mod parameters;
/// FROM/JOIN table scope of a parsed statement.
pub mod scope;
/// Metadata source trait and the offline DDL/JSON catalog.
pub mod source;
/// Column, parameter and per-kind statement metadata shapes.
pub mod statement;
