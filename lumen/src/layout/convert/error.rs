//! Error contexts for conversion to and from foreign formats.

use crate::deps::arcstr::ArcStr;
use crate::layout::error::{LayoutError, LayoutResult};

/// A piece of context for tracing where conversion errors occur.
#[derive(Debug, Clone)]
pub enum ErrorContext {
    Library,
    Cell(ArcStr),
    Instance(ArcStr),
    Geometry,
    Annotations,
    Ports,
    Units,
}

/// Helpers for converter implementations that carry a context backtrace.
pub(crate) trait ErrorHelper {
    /// The current backtrace of [`ErrorContext`]s.
    fn backtrace(&self) -> Vec<ErrorContext>;

    /// Creates an export-side failure with the current backtrace.
    fn export_err<T>(&self, message: impl Into<String>) -> LayoutResult<T> {
        Err(LayoutError::Export {
            message: message.into(),
            stack: self.backtrace(),
        })
    }

    /// Creates an import-side failure with the current backtrace.
    fn import_err<T>(&self, message: impl Into<String>) -> LayoutResult<T> {
        Err(LayoutError::Import {
            message: message.into(),
            stack: self.backtrace(),
        })
    }

    /// Unwraps an [`Option`], failing with `message` if it is `None`.
    fn unwrap_or_fail<T>(&self, value: Option<T>, message: impl Into<String>) -> LayoutResult<T> {
        match value {
            Some(value) => Ok(value),
            None => self.export_err(message),
        }
    }
}
