use sea_orm_migration::prelude::*;

use crate::m20251001_000001_create_catalog_tables::Jobs;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    // Identity-provider user id
                    .col(ColumnDef::new(UserProfiles::UserId).string().not_null().primary_key())
                    .col(ColumnDef::new(UserProfiles::FullName).string().null())
                    .col(ColumnDef::new(UserProfiles::Email).string().null())
                    .col(ColumnDef::new(UserProfiles::Contact).string().null())
                    .col(ColumnDef::new(UserProfiles::ActiveResumeId).uuid().null())
                    .col(
                        ColumnDef::new(UserProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Resumes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Resumes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Resumes::UserProfileId).string().not_null())
                    .col(ColumnDef::new(Resumes::Name).string().not_null())
                    .col(ColumnDef::new(Resumes::Url).string().not_null())
                    .col(
                        ColumnDef::new(Resumes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_resumes_user_profile")
                            .from(Resumes::Table, Resumes::UserProfileId)
                            .to(UserProfiles::Table, UserProfiles::UserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // No uniqueness on (user_profile_id, job_id): every application is kept
        manager
            .create_table(
                Table::create()
                    .table(AppliedJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AppliedJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AppliedJobs::UserProfileId).string().not_null())
                    .col(ColumnDef::new(AppliedJobs::JobId).uuid().not_null())
                    .col(
                        ColumnDef::new(AppliedJobs::AppliedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_applied_jobs_user_profile")
                            .from(AppliedJobs::Table, AppliedJobs::UserProfileId)
                            .to(UserProfiles::Table, UserProfiles::UserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_applied_jobs_job")
                            .from(AppliedJobs::Table, AppliedJobs::JobId)
                            .to(Jobs::Table, Jobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_applied_jobs_job_id")
                    .table(AppliedJobs::Table)
                    .col(AppliedJobs::JobId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppliedJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Resumes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    UserId,
    FullName,
    Email,
    Contact,
    ActiveResumeId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Resumes {
    Table,
    Id,
    UserProfileId,
    Name,
    Url,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AppliedJobs {
    Table,
    Id,
    UserProfileId,
    JobId,
    AppliedAt,
}
