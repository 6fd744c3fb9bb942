use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("user"),
                    )
                    .col(ColumnDef::new(Users::ProfilePicture).string())
                    .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserActivityLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserActivityLog::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserActivityLog::UserId).integer())
                    .col(ColumnDef::new(UserActivityLog::ActivityType).string().not_null())
                    .col(ColumnDef::new(UserActivityLog::Description).text().not_null())
                    .col(ColumnDef::new(UserActivityLog::Timestamp).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_activity_log-user_id")
                            .from(UserActivityLog::Table, UserActivityLog::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_activity_log_user_id")
                    .table(UserActivityLog::Table)
                    .col(UserActivityLog::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserActivityLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Name,
    Role,
    ProfilePicture,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserActivityLog {
    Table,
    Id,
    UserId,
    ActivityType,
    Description,
    Timestamp,
}
