use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only audit record. `user_id` deliberately carries no foreign key so
/// rows outlive the account they describe.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "access_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: Option<i32>,
    pub credential: Option<String>,
    pub action: String,
    pub method: Option<String>,
    pub path: Option<String>,
    pub ip: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
