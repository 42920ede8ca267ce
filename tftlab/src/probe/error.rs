use thiserror::Error;

/// An error reading or fitting probe-station data.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProbeError {
    #[error("no `{0}` header row found")]
    MissingHeader(String),

    #[error("row {row} has {len} fields, but field {field} was requested")]
    ShortRow { row: usize, len: usize, field: usize },

    #[error("field {field:?} in row {row} is not a number")]
    NonNumeric { row: usize, field: String },

    #[error("no sweep setup for source `{0}`")]
    MissingSetup(String),

    #[error("cannot parse device parameters from file name {0:?}")]
    BadFileName(String),

    #[error("x and y have different lengths ({x} and {y})")]
    LengthMismatch { x: usize, y: usize },

    #[error("a fit needs at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("least-squares system is singular")]
    Singular,
}
