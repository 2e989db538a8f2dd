//! The module contains the errors the engine can return.
//!
//! Malformed numeric text is never an error: it is coerced to zero by
//! [`LineValue`]. Errors are reserved for explicit actions that can fail:
//!
//! - [`KeyNotFound`] thrown when a project or reference is missing.
//! - [`ExistingKey`] thrown when a project name is already taken.
//! - [`EmptyReference`] thrown when saving a reference table with no
//!   complete entry.
//! - [`NoWorkspace`] thrown when an operation needs an open workspace.
//!
//!  [`LineValue`]: crate::LineValue
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`EmptyReference`]: EngineError::EmptyReference
//!  [`NoWorkspace`]: EngineError::NoWorkspace
use std::path::PathBuf;

use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Reference table has no complete entry")]
    EmptyReference,
    #[error("No workspace selected")]
    NoWorkspace,
    #[error("Workspace not found: {}", .0.display())]
    WorkspaceNotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::EmptyReference, Self::EmptyReference) => true,
            (Self::NoWorkspace, Self::NoWorkspace) => true,
            (Self::WorkspaceNotFound(a), Self::WorkspaceNotFound(b)) => a == b,
            (Self::Io(a), Self::Io(b)) => a.kind() == b.kind(),
            (Self::Csv(a), Self::Csv(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
