/// camelCase identifiers, package segments, and business-name validation.
pub mod naming;
/// Source database type names to target-language and driver types.
pub mod type_mapper;
