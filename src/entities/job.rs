use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize, ToSchema)]
#[schema(as = Job)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Identity-provider id of the poster
    pub user_id: String,
    pub title: String,
    /// Long rich-text description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub short_description: String,
    pub image_url: Option<String>,
    pub is_published: bool,
    /// List of tag strings
    #[schema(value_type = Vec<String>)]
    pub tags: Json,
    pub hourly_rate: Option<String>,
    /// One of `full-time`, `part-time`, `contract`
    pub shift_timing: Option<String>,
    /// One of `remote`, `hybrid`, `office`
    pub work_mode: Option<String>,
    /// Experience bucket: `0`, `2`, `3` or `5`
    pub years_of_experience: Option<String>,
    pub category_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id",
        on_delete = "SetNull"
    )]
    Company,
    #[sea_orm(has_many = "super::attachment::Entity")]
    Attachment,
    #[sea_orm(has_many = "super::saved_job::Entity")]
    SavedJob,
    #[sea_orm(has_many = "super::applied_job::Entity")]
    AppliedJob,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachment.def()
    }
}

impl Related<super::saved_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavedJob.def()
    }
}

impl Related<super::applied_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppliedJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Tags as plain strings; anything that is not a JSON string is skipped.
    pub fn tag_list(&self) -> Vec<String> {
        match &self.tags {
            Json::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}
