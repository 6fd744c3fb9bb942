use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Branding::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Branding::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Branding::TitleText).string().not_null())
                    .col(ColumnDef::new(Branding::Description).text())
                    .col(ColumnDef::new(Branding::FileFormat).string())
                    .col(ColumnDef::new(Branding::Logo).string())
                    .col(ColumnDef::new(Branding::LoginBackground).string())
                    .col(
                        ColumnDef::new(Branding::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Branding::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Branding::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Branding::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Branding {
    Table,
    Id,
    TitleText,
    Description,
    FileFormat,
    Logo,
    LoginBackground,
    Status,
    CreatedAt,
    UpdatedAt,
}
