pub const ID_LENGTH: usize = 24;
pub const MIN_ROUNDS: i32 = 0;
pub const MAX_ROUNDS: i32 = 3;
pub const MAX_SCAN_LIMIT: i64 = 1000;
pub const DEFAULT_SCAN_LIMIT: i64 = 1000;
pub const DEFAULT_SCAN_OFFSET: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Identifier must be exactly {ID_LENGTH} characters, got {0}")]
    InvalidIdLength(usize),
    #[error("Identifier contains invalid character: {0:?}")]
    InvalidIdCharacter(char),
    #[error("Rounds must be between {MIN_ROUNDS} and {MAX_ROUNDS}, got {0}")]
    RoundsOutOfRange(i32),
    #[error("Group does not exist")]
    UnknownGroup,
    #[error("Candidate is not a meal choice of this group")]
    UnknownCandidate,
}

pub fn validate_rounds(rounds: i32) -> Result<(), ValidationError> {
    if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&rounds) {
        return Err(ValidationError::RoundsOutOfRange(rounds));
    }
    Ok(())
}
