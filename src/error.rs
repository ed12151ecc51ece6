use thiserror::Error;

use crate::issue::ConversionResult;

/// Hard failures. Soft findings never show up here; they are collected as
/// [`crate::issue::ConversionIssue`] entries on the result.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unrecognised OpenAPI version `{0}`")]
    InvalidVersion(String),

    #[error("expected a {expected} document, got a {found} document")]
    UnexpectedDocument {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unsupported source document: {0}")]
    UnsupportedSource(String),

    #[error("failed to load `{location}`: {source}")]
    Load {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("`{location}` has {} structural error(s): {}", errors.len(), errors.join("; "))]
    Parse {
        location: String,
        errors: Vec<String>,
    },

    #[error("overlay failed: {0}")]
    Overlay(#[source] anyhow::Error),

    /// Strict mode escalation. The fully populated result is kept so callers can
    /// still inspect every diagnostic.
    #[error(
        "strict mode: conversion produced {} warning(s) and {} critical issue(s)",
        .0.warning_count,
        .0.critical_count
    )]
    Strict(Box<ConversionResult>),
}

impl Error {
    /// The conversion result attached to a strict-mode failure, if any.
    pub fn result(&self) -> Option<&ConversionResult> {
        match self {
            Error::Strict(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<ConversionResult> {
        match self {
            Error::Strict(result) => Some(*result),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
