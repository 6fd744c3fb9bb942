use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Disaster::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Disaster::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Disaster::DisasterType).string().not_null())
                    .col(ColumnDef::new(Disaster::DisasterDate).date().not_null())
                    .col(ColumnDef::new(Disaster::CreatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AffectedFamily::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffectedFamily::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AffectedFamily::FamilyId).integer().not_null())
                    .col(ColumnDef::new(AffectedFamily::DisasterId).integer().not_null())
                    .col(ColumnDef::new(AffectedFamily::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-affected_family-family_id")
                            .from(AffectedFamily::Table, AffectedFamily::FamilyId)
                            .to(Family::Table, Family::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-affected_family-disaster_id")
                            .from(AffectedFamily::Table, AffectedFamily::DisasterId)
                            .to(Disaster::Table, Disaster::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A family is linked to a given disaster at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_affected_family_family_disaster")
                    .table(AffectedFamily::Table)
                    .col(AffectedFamily::FamilyId)
                    .col(AffectedFamily::DisasterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_affected_family_disaster_id")
                    .table(AffectedFamily::Table)
                    .col(AffectedFamily::DisasterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_disaster_type")
                    .table(Disaster::Table)
                    .col(Disaster::DisasterType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AffectedFamily::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Disaster::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Disaster {
    Table,
    Id,
    DisasterType,
    DisasterDate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AffectedFamily {
    Table,
    Id,
    FamilyId,
    DisasterId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Family {
    Table,
    Id,
}
