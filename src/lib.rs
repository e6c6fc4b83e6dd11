//! Turn hand-written parameterized SQL plus catalog metadata into a typed
//! data-access code model and the class shapes generated from it.
#![warn(missing_docs)]

/// Statement-kind classification.
pub mod classifier;
/// TOML generator configuration.
pub mod config;
/// Crate error types.
pub mod error;
/// Code model construction and artifact emitters.
pub mod generator;
/// Type mapping and identifier naming.
pub mod mapping;
/// Metadata sources and statement analysis.
pub mod metadata;
/// JSON and markdown rendering.
pub mod output;
/// SQL parsing, identifier normalization, and placeholder scanning.
pub mod parser;
/// End-to-end generation pipeline.
pub mod pipeline;

pub use config::GeneratorConfig;
pub use error::{Error, MetadataError, Result};
pub use pipeline::{generate, generate_with, Generation};
