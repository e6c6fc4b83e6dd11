use std::fmt::Write;

use crate::generator::code_model::{CodeModel, ParameterStyle};
use crate::pipeline::Generation;

/// Build a markdown report with field and parameter tables and the list of
/// degraded (weakly typed or unresolved) items.
pub fn build_report(generation: &Generation) -> String {
    let mut report = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut report, generation);
    report
}

fn write_report(report: &mut String, generation: &Generation) -> std::fmt::Result {
    let model = &generation.model;

    writeln!(
        report,
        "# sql2dao Generation Report: {}",
        model.business_domain_name()
    )?;
    writeln!(report)?;
    writeln!(report, "- **Statement:** {}", model.statement_kind())?;
    if let Some(table) = model.table() {
        writeln!(report, "- **Table:** {table}")?;
    }
    writeln!(report, "- **Artifacts:** {}", artifact_list(generation))?;

    writeln!(report)?;
    writeln!(report, "## Fields")?;
    writeln!(report)?;
    if model.fields().is_empty() {
        writeln!(report, "_none_")?;
    } else {
        writeln!(report, "| Field | Type | Column | Table | Nullable |")?;
        writeln!(report, "|-------|------|--------|-------|----------|")?;
        for field in model.fields() {
            writeln!(
                report,
                "| {} | {} | {} | {} | {} |",
                field.identifier,
                field.target_type,
                field.source_column,
                field.owning_table.as_deref().unwrap_or("?"),
                if field.nullable { "yes" } else { "no" }
            )?;
        }
    }

    writeln!(report)?;
    writeln!(report, "## Parameters")?;
    writeln!(report)?;
    if model.parameters().is_empty() {
        writeln!(report, "_none_")?;
    } else {
        writeln!(report, "| # | Name | Type | Driver Type | Style |")?;
        writeln!(report, "|---|------|------|-------------|-------|")?;
        for parameter in model.parameters() {
            writeln!(
                report,
                "| {} | {} | {} | {} | {} |",
                parameter.ordinal,
                parameter.bind_name,
                parameter.target_type,
                parameter.source_type_name,
                format_style(parameter.style)
            )?;
        }
    }

    writeln!(report)?;
    writeln!(report, "## SQL")?;
    writeln!(report)?;
    writeln!(report, "```sql")?;
    writeln!(report, "{}", model.rewritten_sql().trim())?;
    writeln!(report, "```")?;

    let degradations = degradations(model);
    if !degradations.is_empty() {
        writeln!(report)?;
        writeln!(report, "## Degradations")?;
        writeln!(report)?;
        for note in degradations {
            writeln!(report, "- {note}")?;
        }
    }
    Ok(())
}

fn artifact_list(generation: &Generation) -> String {
    generation
        .artifacts
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_style(style: ParameterStyle) -> &'static str {
    match style {
        ParameterStyle::Path => "path",
        ParameterStyle::Query => "query",
        ParameterStyle::Body => "body",
    }
}

/// Human-readable notes for every item that fell back to a default.
pub fn degradations(model: &CodeModel) -> Vec<String> {
    let mut notes = Vec::new();
    for field in model.fields() {
        if field.type_defaulted {
            notes.push(format!(
                "field `{}`: type unknown, using {}",
                field.identifier, field.target_type
            ));
        }
        if field.owning_table.is_none() {
            notes.push(format!(
                "field `{}`: owning table could not be resolved",
                field.identifier
            ));
        }
    }
    for parameter in model.parameters() {
        if parameter.type_defaulted {
            notes.push(format!(
                "parameter {} (`{}`): driver type unavailable, using {}",
                parameter.ordinal, parameter.bind_name, parameter.target_type
            ));
        }
        let positional = parameter
            .bind_name
            .strip_prefix("param")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
        if positional {
            notes.push(format!(
                "parameter {}: no column name found, named `{}`",
                parameter.ordinal, parameter.bind_name
            ));
        }
    }
    notes
}
