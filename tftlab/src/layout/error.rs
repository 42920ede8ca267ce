//! Errors raised while converting mask layouts to and from GDS.

use std::fmt::Display;

use arcstr::ArcStr;
use thiserror::Error;

/// The part of a GDS library being converted when an error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvStep {
    Library,
    Units,
    Cell(ArcStr),
    Instance(ArcStr),
    Array(ArcStr),
    Geometry,
    Annotations,
}

impl Display for ConvStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Units => write!(f, "units"),
            Self::Cell(name) => write!(f, "cell `{name}`"),
            Self::Instance(name) => write!(f, "instance of `{name}`"),
            Self::Array(name) => write!(f, "array of `{name}`"),
            Self::Geometry => write!(f, "geometry"),
            Self::Annotations => write!(f, "labels"),
        }
    }
}

fn trail(steps: &[ConvStep]) -> String {
    steps
        .iter()
        .rev()
        .map(|step| format!("\n - in {step}"))
        .collect()
}

/// A GDS conversion error.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("cannot export GDS: {message}{}", trail(.steps))]
    Export {
        message: String,
        steps: Vec<ConvStep>,
    },

    #[error("cannot import GDS: {message}{}", trail(.steps))]
    Import {
        message: String,
        steps: Vec<ConvStep>,
    },

    #[error("structure `{0}` is instantiated but never defined")]
    UndefinedStruct(String),

    #[error("coordinate does not fit in a GDS point: {0}")]
    CoordinateRange(#[from] std::num::TryFromIntError),

    #[error("GDS error: {0}")]
    Gds(String),
}

impl From<gds21::GdsError> for LayoutError {
    fn from(value: gds21::GdsError) -> Self {
        Self::Gds(value.to_string())
    }
}

/// The [`LayoutError`] result type.
pub type LayoutResult<T> = Result<T, LayoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_lists_innermost_step_first() {
        let err = LayoutError::Import {
            message: "boundary is not closed".to_string(),
            steps: vec![
                ConvStep::Library,
                ConvStep::Cell(arcstr::literal!("tft_10_5")),
                ConvStep::Geometry,
            ],
        };
        assert_eq!(
            err.to_string(),
            "cannot import GDS: boundary is not closed\n - in geometry\n - in cell `tft_10_5`\n - in library"
        );
    }

    #[test]
    fn gds_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<LayoutError>();
        assert_send_sync::<crate::error::TftError>();

        let err = LayoutError::from(gds21::GdsError::Str("bad record".to_string()));
        assert!(err.to_string().contains("bad record"));
        let err: anyhow::Error = crate::error::TftError::from(err).into();
        assert!(err.to_string().contains("bad record"));
    }
}
