// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Error types for the engine

use thiserror::Error;
use warden_core::job::FieldError;
use warden_core::storage::StorageError;

use crate::directory::DirectoryError;

/// Errors that can occur in the scheduling and dispatch engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Validation failed; every offending field is listed
    #[error("invalid fields: {}", format_fields(.0))]
    InvalidFields(Vec<FieldError>),

    #[error("job {name:?} already exists in view {view:?}")]
    DuplicateName { name: String, view: String },

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("operation not found: {0}")]
    OperationNotFound(String),

    #[error("queue entry not found: {0}")]
    EntryNotFound(String),

    #[error("job {0} carries no operation to dispatch")]
    NothingToDispatch(String),

    #[error("target resolution failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    /// The offending fields, when validation was the failure
    pub fn invalid_fields(&self) -> &[FieldError] {
        match self {
            EngineError::InvalidFields(fields) => fields,
            _ => &[],
        }
    }
}
