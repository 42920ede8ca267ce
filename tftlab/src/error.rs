use std::fmt::{Debug, Display};
use std::path::PathBuf;

use thiserror::Error;

use crate::deps::arcstr::ArcStr;
use crate::layout::error::LayoutError;
use crate::probe::error::ProbeError;

pub type Result<T> = std::result::Result<T, TftError>;

pub struct TftError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl TftError {
    pub fn source(&self) -> &ErrorSource {
        &self.source
    }
}

impl std::error::Error for TftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for TftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error:\n{}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for item in self.context.iter() {
                writeln!(f, "\twhile {}", item)?;
            }
        }
        Ok(())
    }
}

impl Debug for TftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for (i, item) in self.context.iter().enumerate() {
                writeln!(f, "\t{}: {:?}", i, item)?;
            }
        }
        Ok(())
    }
}

impl<T> From<T> for TftError
where
    T: Into<ErrorSource>,
{
    fn from(value: T) -> Self {
        Self {
            source: value.into(),
            context: Vec::new(),
        }
    }
}

impl TftError {
    pub fn new(source: impl Into<ErrorSource>) -> Self {
        Self {
            source: source.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<ErrorContext>) -> Self {
        self.context.push(ctx.into());
        self
    }

    #[inline]
    pub fn into_inner(self) -> ErrorSource {
        self.source
    }
}

#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<TftError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    GenComponent { name: ArcStr, type_name: ArcStr },
    InitComponent { type_name: ArcStr },
    CreateDir(PathBuf),
    CreateFile(PathBuf),
    ReadFile(PathBuf),
    ParseFile(PathBuf),
    Task(ArcStr),
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorContext::*;
        match self {
            GenComponent { name, type_name } => {
                write!(f, "generating layout of component {type_name} ({name})")
            }
            InitComponent { type_name } => write!(f, "initializing component {type_name}"),
            CreateDir(path) => write!(f, "creating directory {path:?}"),
            CreateFile(path) => write!(f, "creating file {path:?}"),
            ReadFile(path) => write!(f, "reading file {path:?}"),
            ParseFile(path) => write!(f, "parsing file {path:?}"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("internal error: {0}")]
    Internal(String),

    #[error("error while generating layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("error while analyzing probe data: {0}")]
    Probe(#[from] ProbeError),

    #[error("no such layer: {0}")]
    LayerNotFound(String),

    #[error("no such cell: {0}")]
    CellNotFound(ArcStr),

    #[error("no such port: {0}")]
    PortNotFound(ArcStr),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("error reading or writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("error serializing component parameters: {0}")]
    Serialization(#[from] flexbuffers::SerializationError),

    #[error("unexpected error: {0}")]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_context() {
        let err = TftError::new(ErrorSource::InvalidArgs("bad width".to_string()))
            .with_context(ErrorContext::Task(arcstr::literal!("drawing pads")));
        let msg = format!("{err}");
        assert!(msg.contains("invalid arguments: bad width"));
        assert!(msg.contains("\twhile drawing pads"));
    }

    #[test]
    fn with_err_context_wraps_io_errors() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = with_err_context(res, || ErrorContext::ReadFile(PathBuf::from("a.dat")))
            .unwrap_err();
        assert!(matches!(err.source(), ErrorSource::Io(_)));
        assert_eq!(err.context, vec![ErrorContext::ReadFile(PathBuf::from("a.dat"))]);
    }
}
