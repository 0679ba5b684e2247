use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::db::now_timestamp;
use crate::domain::{FileId, UserId};
use crate::entities::{geojson_files, prelude::*};

/// A stored document. `content` is kept byte-for-byte as uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoJsonFile {
    pub id: FileId,
    pub owner: UserId,
    pub name: String,
    pub content: String,
    pub size_bytes: i64,
    pub created_at: String,
}

impl From<geojson_files::Model> for GeoJsonFile {
    fn from(model: geojson_files::Model) -> Self {
        Self {
            id: FileId::new(model.id),
            owner: UserId::new(model.user_id),
            name: model.name,
            content: model.content,
            size_bytes: model.size_bytes,
            created_at: model.created_at,
        }
    }
}

/// Listing entry without the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoJsonSummary {
    pub id: FileId,
    pub owner: UserId,
    pub name: String,
    pub size_bytes: i64,
    pub created_at: String,
}

impl From<geojson_files::Model> for GeoJsonSummary {
    fn from(model: geojson_files::Model) -> Self {
        Self {
            id: FileId::new(model.id),
            owner: UserId::new(model.user_id),
            name: model.name,
            size_bytes: model.size_bytes,
            created_at: model.created_at,
        }
    }
}

fn new_row(owner: UserId, name: &str, content: String) -> geojson_files::ActiveModel {
    let size_bytes = i64::try_from(content.len()).unwrap_or(i64::MAX);
    geojson_files::ActiveModel {
        user_id: Set(owner.value()),
        name: Set(name.to_string()),
        content: Set(content),
        size_bytes: Set(size_bytes),
        created_at: Set(now_timestamp()),
        ..Default::default()
    }
}

/// File access bound to a single owner. Every query carries the owner
/// predicate, so a file that belongs to someone else looks exactly like a
/// file that does not exist.
pub struct ScopedGeoJsonRepository {
    conn: DatabaseConnection,
    owner: UserId,
}

impl ScopedGeoJsonRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, owner: UserId) -> Self {
        Self { conn, owner }
    }

    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    fn owned(&self) -> sea_orm::Select<GeojsonFiles> {
        GeojsonFiles::find().filter(geojson_files::Column::UserId.eq(self.owner.value()))
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<GeoJsonSummary>> {
        let rows = self
            .owned()
            .order_by_desc(geojson_files::Column::CreatedAt)
            .order_by_desc(geojson_files::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list files")?;

        Ok(rows.into_iter().map(GeoJsonSummary::from).collect())
    }

    /// Newest first, with document bodies.
    pub async fn list_with_content(&self) -> Result<Vec<GeoJsonFile>> {
        let rows = self
            .owned()
            .order_by_desc(geojson_files::Column::CreatedAt)
            .order_by_desc(geojson_files::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list files")?;

        Ok(rows.into_iter().map(GeoJsonFile::from).collect())
    }

    pub async fn get(&self, id: FileId) -> Result<Option<GeoJsonFile>> {
        let row = self
            .owned()
            .filter(geojson_files::Column::Id.eq(id.value()))
            .one(&self.conn)
            .await
            .context("Failed to query file")?;

        Ok(row.map(GeoJsonFile::from))
    }

    pub async fn insert(&self, name: &str, content: String) -> Result<GeoJsonFile> {
        let model = new_row(self.owner, name, content)
            .insert(&self.conn)
            .await
            .context("Failed to insert file")?;

        Ok(GeoJsonFile::from(model))
    }

    /// Inserts all documents or none of them.
    pub async fn insert_many(&self, docs: Vec<(String, String)>) -> Result<Vec<GeoJsonSummary>> {
        let txn = self.conn.begin().await?;

        let mut inserted = Vec::with_capacity(docs.len());
        for (name, content) in docs {
            let model = new_row(self.owner, &name, content)
                .insert(&txn)
                .await
                .with_context(|| format!("Failed to insert file {name}"))?;
            inserted.push(GeoJsonSummary::from(model));
        }

        txn.commit().await?;
        Ok(inserted)
    }

    /// Returns `false` if no file with this id belongs to the owner.
    pub async fn delete(&self, id: FileId) -> Result<bool> {
        let result = GeojsonFiles::delete_many()
            .filter(geojson_files::Column::Id.eq(id.value()))
            .filter(geojson_files::Column::UserId.eq(self.owner.value()))
            .exec(&self.conn)
            .await
            .context("Failed to delete file")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn names(&self) -> Result<Vec<String>> {
        self.owned()
            .select_only()
            .column(geojson_files::Column::Name)
            .into_tuple::<String>()
            .all(&self.conn)
            .await
            .context("Failed to list file names")
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.owned().count(&self.conn).await?)
    }
}

/// Unscoped access used by the administration panel only.
pub struct GeoJsonRepository {
    conn: DatabaseConnection,
}

impl GeoJsonRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, owner: Option<UserId>) -> Result<Vec<GeoJsonSummary>> {
        let mut query = GeojsonFiles::find()
            .order_by_desc(geojson_files::Column::CreatedAt)
            .order_by_desc(geojson_files::Column::Id);

        if let Some(owner) = owner {
            query = query.filter(geojson_files::Column::UserId.eq(owner.value()));
        }

        let rows = query.all(&self.conn).await.context("Failed to list files")?;
        Ok(rows.into_iter().map(GeoJsonSummary::from).collect())
    }

    pub async fn get(&self, id: FileId) -> Result<Option<GeoJsonFile>> {
        let row = GeojsonFiles::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query file")?;
        Ok(row.map(GeoJsonFile::from))
    }

    pub async fn insert(&self, owner: UserId, name: &str, content: String) -> Result<GeoJsonFile> {
        let model = new_row(owner, name, content)
            .insert(&self.conn)
            .await
            .context("Failed to insert file")?;
        Ok(GeoJsonFile::from(model))
    }

    /// Renames and/or replaces the body. Ownership cannot be changed here.
    pub async fn update(
        &self,
        id: FileId,
        name: Option<String>,
        content: Option<String>,
    ) -> Result<Option<GeoJsonFile>> {
        let Some(row) = GeojsonFiles::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query file for update")?
        else {
            return Ok(None);
        };

        let mut active: geojson_files::ActiveModel = row.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(content) = content {
            active.size_bytes = Set(i64::try_from(content.len()).unwrap_or(i64::MAX));
            active.content = Set(content);
        }

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update file")?;
        Ok(Some(GeoJsonFile::from(model)))
    }

    pub async fn delete(&self, id: FileId) -> Result<bool> {
        let result = GeojsonFiles::delete_by_id(id.value())
            .exec(&self.conn)
            .await
            .context("Failed to delete file")?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(GeojsonFiles::find().count(&self.conn).await?)
    }
}
