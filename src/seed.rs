//! Reference data every deployment needs.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set};
use uuid::Uuid;

use crate::entities::category;

pub const CATEGORY_NAMES: [&str; 23] = [
    "Software Development",
    "Web Development",
    "Mobile App Development",
    "Data Science",
    "Machine Learning",
    "Artificial Intelligence",
    "UI/UX Design",
    "Product Management",
    "Project Management",
    "Quality Assurance",
    "DevOps",
    "Cybersecurity",
    "Cloud Computing",
    "Database Administration",
    "Network Engineering",
    "Business Analysis",
    "Sales",
    "Marketing",
    "Customer Support",
    "Human Resources",
    "Finance",
    "Accounting",
    "Legal",
];

/// Inserts any missing job categories. Returns how many were added.
pub async fn seed_categories<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    let mut added = 0;
    for name in CATEGORY_NAMES {
        added += category::Entity::insert(category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::column(category::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    }
    tracing::info!("Seeded {} new categories", added);
    Ok(added)
}
