use crate::entities::geojson_files;
use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(GeojsonFiles)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Every user-facing query filters on the owner.
        manager
            .create_index(
                Index::create()
                    .name("idx_geojson_files_user_id")
                    .table(GeojsonFiles)
                    .col(geojson_files::Column::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GeojsonFiles).to_owned())
            .await
    }
}
