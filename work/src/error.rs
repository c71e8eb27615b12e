use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("difficulty must be a run of '0' hex digits, got {0:?}")]
    InvalidDifficulty(String),

    #[error("no valid nonce in {attempts} attempts")]
    Exhausted { attempts: u64 },
}
