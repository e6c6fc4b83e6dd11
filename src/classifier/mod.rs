/// SELECT/INSERT/UPDATE/DELETE classification with a keyword fallback.
pub mod statement_kind;
