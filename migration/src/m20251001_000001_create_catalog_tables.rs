use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Categories::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Categories::Name).string().not_null().unique_key())
                    .col(
                        ColumnDef::new(Categories::CreatedAt)
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
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Companies::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Companies::UserId).string().not_null())
                    .col(ColumnDef::new(Companies::Name).string().not_null())
                    .col(ColumnDef::new(Companies::Description).text().not_null())
                    .col(ColumnDef::new(Companies::Logo).string().not_null())
                    .col(ColumnDef::new(Companies::CoverImage).string().not_null())
                    .col(ColumnDef::new(Companies::Mail).string().not_null())
                    .col(ColumnDef::new(Companies::Website).string().not_null())
                    .col(ColumnDef::new(Companies::LinkedIn).string().not_null())
                    .col(ColumnDef::new(Companies::AddressLine1).string().not_null())
                    .col(ColumnDef::new(Companies::AddressLine2).string().not_null())
                    .col(ColumnDef::new(Companies::City).string().not_null())
                    .col(ColumnDef::new(Companies::State).string().not_null())
                    .col(ColumnDef::new(Companies::Zipcode).string().not_null())
                    .col(ColumnDef::new(Companies::Overview).text().not_null()) // Rich text
                    .col(ColumnDef::new(Companies::WhyJoinUs).text().not_null()) // Rich text
                    .col(
                        ColumnDef::new(Companies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Companies::UpdatedAt)
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
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Jobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Jobs::UserId).string().not_null())
                    .col(ColumnDef::new(Jobs::Title).string().not_null())
                    .col(ColumnDef::new(Jobs::Description).text().not_null()) // Rich text
                    .col(ColumnDef::new(Jobs::ShortDescription).text().not_null())
                    .col(ColumnDef::new(Jobs::ImageUrl).string().null())
                    .col(ColumnDef::new(Jobs::IsPublished).boolean().not_null().default(false))
                    .col(ColumnDef::new(Jobs::Tags).json().not_null())
                    .col(ColumnDef::new(Jobs::HourlyRate).string().null())
                    .col(ColumnDef::new(Jobs::ShiftTiming).string().null())
                    .col(ColumnDef::new(Jobs::WorkMode).string().null())
                    .col(ColumnDef::new(Jobs::YearsOfExperience).string().null())
                    .col(ColumnDef::new(Jobs::CategoryId).uuid().null())
                    .col(ColumnDef::new(Jobs::CompanyId).uuid().null())
                    .col(
                        ColumnDef::new(Jobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Jobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jobs_category")
                            .from(Jobs::Table, Jobs::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jobs_company")
                            .from(Jobs::Table, Jobs::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_created_at")
                    .table(Jobs::Table)
                    .col(Jobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_user_id")
                    .table(Jobs::Table)
                    .col(Jobs::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Attachments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Attachments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Attachments::JobId).uuid().not_null())
                    .col(ColumnDef::new(Attachments::Name).string().not_null())
                    .col(ColumnDef::new(Attachments::Url).string().not_null())
                    .col(
                        ColumnDef::new(Attachments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attachments_job")
                            .from(Attachments::Table, Attachments::JobId)
                            .to(Jobs::Table, Jobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Set-like membership: the composite key rejects duplicate saves
        manager
            .create_table(
                Table::create()
                    .table(SavedJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SavedJobs::JobId).uuid().not_null())
                    .col(ColumnDef::new(SavedJobs::UserId).string().not_null())
                    .col(
                        ColumnDef::new(SavedJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(Index::create().col(SavedJobs::JobId).col(SavedJobs::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saved_jobs_job")
                            .from(SavedJobs::Table, SavedJobs::JobId)
                            .to(Jobs::Table, Jobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CompanyFollowers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CompanyFollowers::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(CompanyFollowers::UserId).string().not_null())
                    .col(
                        ColumnDef::new(CompanyFollowers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(CompanyFollowers::CompanyId)
                            .col(CompanyFollowers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_followers_company")
                            .from(CompanyFollowers::Table, CompanyFollowers::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CompanyFollowers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SavedJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    UserId,
    Name,
    Description,
    Logo,
    CoverImage,
    Mail,
    Website,
    LinkedIn,
    #[sea_orm(iden = "address_line_1")]
    AddressLine1,
    #[sea_orm(iden = "address_line_2")]
    AddressLine2,
    City,
    State,
    Zipcode,
    Overview,
    WhyJoinUs,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Jobs {
    Table,
    Id,
    UserId,
    Title,
    Description,
    ShortDescription,
    ImageUrl,
    IsPublished,
    Tags,
    HourlyRate,
    ShiftTiming,
    WorkMode,
    YearsOfExperience,
    CategoryId,
    CompanyId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Attachments {
    Table,
    Id,
    JobId,
    Name,
    Url,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SavedJobs {
    Table,
    JobId,
    UserId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CompanyFollowers {
    Table,
    CompanyId,
    UserId,
    CreatedAt,
}
