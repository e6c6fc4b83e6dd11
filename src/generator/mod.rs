/// Artifact-agnostic code model: fields, parameters, styles, rewritten SQL.
pub mod code_model;
/// Class-shape emitters (DTO, DAO, controller, config) and their registry.
pub mod emitters;
