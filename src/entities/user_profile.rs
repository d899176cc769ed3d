use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize, ToSchema)]
#[schema(as = UserProfile)]
#[sea_orm(table_name = "user_profiles")]
pub struct Model {
    /// Identity-provider user id
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub active_resume_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::resume::Entity")]
    Resume,
    #[sea_orm(has_many = "super::applied_job::Entity")]
    AppliedJob,
}

impl Related<super::resume::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resume.def()
    }
}

impl Related<super::applied_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AppliedJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
