use std::fmt::{Debug, Display};
use std::path::PathBuf;

use thiserror::Error;

use crate::component;
use crate::deps::arcstr::ArcStr;
use crate::layout::cell::PortError;
use crate::layout::error::LayoutError;

pub type Result<T> = std::result::Result<T, LumenError>;

/// The library-wide error type: an [`ErrorSource`] plus the stack of
/// [`ErrorContext`] frames that was active when the error occurred.
pub struct LumenError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl LumenError {
    pub fn new(source: impl Into<ErrorSource>) -> Self {
        Self {
            source: source.into(),
            context: Vec::new(),
        }
    }

    pub fn source(&self) -> &ErrorSource {
        &self.source
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

impl std::error::Error for LumenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for LumenError {
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

impl Debug for LumenError {
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

impl<T> From<T> for LumenError
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

/// Runs `result` through a context frame, attaching `ctx` to any error.
#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<LumenError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

/// A frame describing what the library was doing when an error occurred.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    GenComponent {
        name: ArcStr,
        type_name: ArcStr,
    },
    InitComponent {
        type_name: ArcStr,
    },
    /// Building a registered component type through the factory registry.
    ///
    /// Carries the registry's known type names so a misspelled or missing
    /// registration is diagnosable from the error alone.
    BuildRegistered {
        component_type: ArcStr,
        available: Vec<ArcStr>,
    },
    CreateDir(PathBuf),
    CreateFile(PathBuf),
    ReadFile(PathBuf),
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
            BuildRegistered {
                component_type,
                available,
            } => write!(
                f,
                "building registered component {component_type} (registry contains: {})",
                available
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CreateDir(path) => write!(f, "creating directory {path:?}"),
            CreateFile(path) => write!(f, "creating file {path:?}"),
            ReadFile(path) => write!(f, "reading file {path:?}"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("error generating component: {0}")]
    Component(#[from] component::error::Error),

    #[error("error converting layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("no such layer: {0}")]
    LayerNotFound(String),

    #[error("error accessing layout port: {0}")]
    Port(#[from] PortError),

    #[error("no such component type: {0}")]
    ComponentTypeNotFound(ArcStr),

    #[error("component type already registered: {0}")]
    DuplicateComponentType(ArcStr),

    #[error("component {0} does not match the locked reference library")]
    ReferenceMismatch(ArcStr),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing TOML: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
