use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Family: one row is both the household and its representative
        manager
            .create_table(
                Table::create()
                    .table(Family::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Family::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Family::Representative).string().not_null())
                    .col(ColumnDef::new(Family::Purok).string().not_null())
                    .col(ColumnDef::new(Family::Age).integer())
                    .col(ColumnDef::new(Family::Gender).string().not_null())
                    .col(ColumnDef::new(Family::BirthDate).date())
                    .col(ColumnDef::new(Family::Status).string().not_null())
                    .col(ColumnDef::new(Family::Phone).string())
                    .col(ColumnDef::new(Family::ResidencyType).string().not_null())
                    .col(ColumnDef::new(Family::OwnerName).string())
                    .col(ColumnDef::new(Family::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Family::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FamilyMember::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FamilyMember::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FamilyMember::FamilyId).integer().not_null())
                    .col(ColumnDef::new(FamilyMember::Name).string().not_null())
                    .col(ColumnDef::new(FamilyMember::Age).integer())
                    .col(ColumnDef::new(FamilyMember::Gender).string().not_null())
                    .col(ColumnDef::new(FamilyMember::Status).string().not_null())
                    .col(ColumnDef::new(FamilyMember::BirthDate).date().not_null())
                    .col(ColumnDef::new(FamilyMember::Phone).string())
                    .col(ColumnDef::new(FamilyMember::Image).string())
                    .col(ColumnDef::new(FamilyMember::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(FamilyMember::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-family_member-family_id")
                            .from(FamilyMember::Table, FamilyMember::FamilyId)
                            .to(Family::Table, Family::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_family_member_family_id")
                    .table(FamilyMember::Table)
                    .col(FamilyMember::FamilyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_family_purok")
                    .table(Family::Table)
                    .col(Family::Purok)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FamilyMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Family::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Family {
    Table,
    Id,
    Representative,
    Purok,
    Age,
    Gender,
    BirthDate,
    Status,
    Phone,
    ResidencyType,
    OwnerName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FamilyMember {
    Table,
    Id,
    FamilyId,
    Name,
    Age,
    Gender,
    Status,
    BirthDate,
    Phone,
    Image,
    CreatedAt,
    UpdatedAt,
}
