//! Document error types

use scrollspy_core::ElementId;
use thiserror::Error;

/// Errors raised while editing or querying the element tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The element handle does not belong to this document (or was removed)
    #[error("Unknown element: {0:?}")]
    UnknownElement(ElementId),

    /// Another element already uses this id
    #[error("Duplicate element id: #{0}")]
    DuplicateId(String),

    /// The viewport cannot be removed
    #[error("The viewport element cannot be removed")]
    ViewportRemoval,

    /// The selector could not be parsed
    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DomError>;
