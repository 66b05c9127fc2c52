use dealership_core::{DomainError, DomainResult};

/// Longest value any text column accepts (`VARCHAR(100)`), in characters.
pub const MAX_TEXT_LEN: usize = 100;

/// Reject any field longer than [`MAX_TEXT_LEN`] characters, naming every offender.
pub(crate) fn check_lengths(fields: &[(&'static str, &str)]) -> DomainResult<()> {
    let too_long: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.chars().count() > MAX_TEXT_LEN)
        .map(|(field, _)| *field)
        .collect();
    if too_long.is_empty() {
        return Ok(());
    }
    Err(DomainError::validation(format!(
        "fields longer than {MAX_TEXT_LEN} characters: {}",
        too_long.join(", ")
    )))
}
