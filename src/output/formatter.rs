use std::str::FromStr;

use serde::Serialize;

use crate::error::Result;
use crate::generator::code_model::CodeModel;
use crate::generator::emitters::ClassShape;
use crate::output::report;
use crate::pipeline::Generation;

/// Rendering requested from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty JSON of the model and class shapes.
    #[default]
    Json,
    /// Markdown generation report.
    Report,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "report" | "md" | "markdown" => Ok(OutputFormat::Report),
            _ => Err(format!("Invalid output format: {s} (expected json or report)")),
        }
    }
}

/// What the external renderer consumes.
#[derive(Serialize)]
struct RendererInput<'a> {
    model: &'a CodeModel,
    artifacts: &'a [ClassShape],
}

/// Pretty JSON of the code model and its class shapes.
pub fn format_json(generation: &Generation) -> Result<String> {
    let input = RendererInput {
        model: &generation.model,
        artifacts: &generation.artifacts,
    };
    Ok(serde_json::to_string_pretty(&input)?)
}

/// Render a generation in the requested format.
pub fn render(generation: &Generation, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format_json(generation),
        OutputFormat::Report => Ok(report::build_report(generation)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parses_aliases() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("markdown".parse::<OutputFormat>(), Ok(OutputFormat::Report));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
