use crate::error::{Error, Result};

/// Convert a raw column or table name into a camelCase identifier.
///
/// The input is lowercased and split on `_`; empty segments are dropped.
/// The first kept segment stays lowercase unless it is the only segment and
/// was wrapped in separators on both sides (`__c__` -> `C`). Input without
/// separators is only lowercased, so `customerName` becomes `customername`.
pub fn to_identifier(raw_name: &str) -> String {
    let lowered = raw_name.trim().to_lowercase();
    let raw_segments: Vec<&str> = lowered.split('_').collect();
    let segments: Vec<&str> = raw_segments.iter().copied().filter(|s| !s.is_empty()).collect();

    let Some((first, rest)) = segments.split_first() else {
        return String::new();
    };

    let enclosed = rest.is_empty()
        && raw_segments.first().is_some_and(|s| s.is_empty())
        && raw_segments.last().is_some_and(|s| s.is_empty());

    let mut identifier = if enclosed {
        capitalize(first)
    } else {
        (*first).to_string()
    };
    for segment in rest {
        identifier.push_str(&capitalize(segment));
    }
    identifier
}

/// Whether `name` matches `[A-Za-z_][A-Za-z0-9_]*` and can be used as a
/// bind name or member name.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lowercased business name, used verbatim as a package segment.
pub fn to_package_segment(business_name: &str) -> String {
    business_name.to_lowercase()
}

/// Business name with its first character uppercased, used as a class prefix.
pub fn to_class_name(business_name: &str) -> String {
    capitalize(business_name)
}

/// Reject business names that are not `[A-Za-z][A-Za-z0-9_]*`.
pub fn validate_business_name(business_name: &str) -> Result<()> {
    let mut chars = business_name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::invalid("businessDomainName must not be empty"));
    };
    if !first.is_ascii_alphabetic() {
        return Err(Error::invalid(format!(
            "businessDomainName '{business_name}' must start with a letter"
        )));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(Error::invalid(format!(
            "businessDomainName '{business_name}' contains invalid character '{bad}'"
        )));
    }
    Ok(())
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
