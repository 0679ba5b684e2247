//! `SeaORM` implementation of the `SigService` trait.

use async_trait::async_trait;
use rust_embed::RustEmbed;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::SigConfig;
use crate::db::{GeoJsonFile, GeoJsonSummary, Store};
use crate::domain::validation::{FILE_NAME_MAX_CHARS, sanitize_file_name};
use crate::domain::{CurrentUser, FileId};
use crate::services::sig_service::{
    LoadExamplesOutcome, SigError, SigService, UNTITLED_NAME, UploadInput,
};

#[derive(RustEmbed)]
#[folder = "assets/samples"]
struct ExampleDocs;

/// Bundled samples, in load order.
pub const EXAMPLE_NAMES: [&str; 3] = ["example1.geojson", "example2.geojson", "example3.geojson"];

pub struct SeaOrmSigService {
    store: Store,
    config: SigConfig,
}

impl SeaOrmSigService {
    #[must_use]
    pub const fn new(store: Store, config: SigConfig) -> Self {
        Self { store, config }
    }

    fn check_content(&self, content: &str) -> Result<(), SigError> {
        if content.trim().is_empty() {
            return Err(SigError::Validation(
                "Select a file or paste a GeoJSON document".to_string(),
            ));
        }
        if content.len() > self.config.max_upload_bytes {
            return Err(SigError::Validation(format!(
                "Document exceeds the {} byte upload limit",
                self.config.max_upload_bytes
            )));
        }
        serde_json::from_str::<serde::de::IgnoredAny>(content)
            .map_err(|e| SigError::Validation(format!("Content is not valid JSON: {e}")))?;
        Ok(())
    }
}

/// Explicit name, then the sanitised filename, then the placeholder.
fn display_name(input: &UploadInput) -> String {
    if let Some(name) = input.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return name.chars().take(FILE_NAME_MAX_CHARS).collect();
    }
    input
        .filename
        .as_deref()
        .and_then(sanitize_file_name)
        .unwrap_or_else(|| UNTITLED_NAME.to_string())
}

fn example_doc(name: &str) -> Option<String> {
    let file = ExampleDocs::get(name)?;
    String::from_utf8(file.data.into_owned()).ok()
}

#[async_trait]
impl SigService for SeaOrmSigService {
    async fn upload(
        &self,
        user: &CurrentUser,
        input: UploadInput,
    ) -> Result<GeoJsonFile, SigError> {
        self.check_content(&input.content)?;
        let name = display_name(&input);

        let file = self
            .store
            .geojson_for(user.id)
            .insert(&name, input.content)
            .await?;

        info!(
            user_id = user.id.value(),
            file_id = file.id.value(),
            size_bytes = file.size_bytes,
            "GeoJSON stored"
        );
        Ok(file)
    }

    async fn list(&self, user: &CurrentUser) -> Result<Vec<GeoJsonSummary>, SigError> {
        Ok(self.store.geojson_for(user.id).list().await?)
    }

    async fn get(&self, user: &CurrentUser, id: FileId) -> Result<GeoJsonFile, SigError> {
        self.store
            .geojson_for(user.id)
            .get(id)
            .await?
            .ok_or(SigError::NotFound)
    }

    async fn delete(&self, user: &CurrentUser, id: FileId) -> Result<(), SigError> {
        if self.store.geojson_for(user.id).delete(id).await? {
            info!(user_id = user.id.value(), file_id = id.value(), "GeoJSON deleted");
            Ok(())
        } else {
            Err(SigError::NotFound)
        }
    }

    async fn load_examples(&self, user: &CurrentUser) -> Result<LoadExamplesOutcome, SigError> {
        let files = self.store.geojson_for(user.id);
        let existing: HashSet<String> = files.names().await?.into_iter().collect();

        let mut outcome = LoadExamplesOutcome::default();
        let mut docs = Vec::new();
        for name in EXAMPLE_NAMES {
            if existing.contains(name) {
                outcome.skipped.push(name.to_string());
                continue;
            }
            match example_doc(name) {
                Some(content) => docs.push((name.to_string(), content)),
                None => {
                    warn!(example = name, "Bundled example missing or not UTF-8");
                    outcome.skipped.push(name.to_string());
                }
            }
        }

        if !docs.is_empty() {
            let inserted = files.insert_many(docs).await?;
            outcome.created = inserted.into_iter().map(|f| f.name).collect();
        }

        info!(
            user_id = user.id.value(),
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            "Examples loaded"
        );
        Ok(outcome)
    }

    async fn list_with_content(&self, user: &CurrentUser) -> Result<Vec<GeoJsonFile>, SigError> {
        Ok(self.store.geojson_for(user.id).list_with_content().await?)
    }
}
