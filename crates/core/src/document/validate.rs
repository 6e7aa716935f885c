/// Input validation shared by the services.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("invalid {kind}: {value}")]
    InvalidId { kind: &'static str, value: String },
    #[error("rating must be between 1 and 5")]
    RatingOutOfRange,
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("role can only be set to student or instructor")]
    UnassignableRole,
    #[error("course price cannot be negative")]
    NegativePrice,
}

/// Take every named field, failing if any is absent or blank.
///
/// All missing fields are reported together, in the order given.
pub fn take_required<const N: usize>(
    fields: [(&'static str, Option<String>); N],
) -> Result<[String; N], ValidationError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }
    Ok(fields.map(|(_, value)| value.unwrap_or_default()))
}

/// Treat blank optional strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
