//! Domain service for a user's own GeoJSON documents.
//!
//! Every operation takes the calling [`CurrentUser`] and only ever sees that
//! user's files.

use serde::Serialize;
use thiserror::Error;

use crate::db::{GeoJsonFile, GeoJsonSummary};
use crate::domain::{CurrentUser, FileId};

pub const UNTITLED_NAME: &str = "Untitled GeoJSON";

#[derive(Debug, Error)]
pub enum SigError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("File not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SigError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SigError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// An upload as received from a form or the JSON API.
#[derive(Debug, Clone, Default)]
pub struct UploadInput {
    /// Explicit display name; wins over the filename.
    pub name: Option<String>,
    /// Client-side filename of an uploaded file, if any.
    pub filename: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadExamplesOutcome {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

#[async_trait::async_trait]
pub trait SigService: Send + Sync {
    /// Stores the document verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`SigError::Validation`] for empty, oversized or malformed JSON.
    async fn upload(&self, user: &CurrentUser, input: UploadInput)
    -> Result<GeoJsonFile, SigError>;

    /// Most recent first.
    async fn list(&self, user: &CurrentUser) -> Result<Vec<GeoJsonSummary>, SigError>;

    /// # Errors
    ///
    /// Returns [`SigError::NotFound`] when the file is absent or not owned.
    async fn get(&self, user: &CurrentUser, id: FileId) -> Result<GeoJsonFile, SigError>;

    /// # Errors
    ///
    /// Returns [`SigError::NotFound`] when the file is absent or not owned.
    async fn delete(&self, user: &CurrentUser, id: FileId) -> Result<(), SigError>;

    /// Adds the bundled sample documents the user does not have yet.
    async fn load_examples(&self, user: &CurrentUser) -> Result<LoadExamplesOutcome, SigError>;

    /// Own files with their bodies, for the map.
    async fn list_with_content(&self, user: &CurrentUser) -> Result<Vec<GeoJsonFile>, SigError>;
}
