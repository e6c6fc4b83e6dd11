/// JSON rendering of the code model and class shapes for an external renderer.
pub mod formatter;
/// Markdown generation report with degraded-item notes.
pub mod report;
