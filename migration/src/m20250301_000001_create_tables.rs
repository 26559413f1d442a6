use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::LineUserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::IsPremium)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::ReplyToken).string())
                    .col(
                        ColumnDef::new(Users::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create units table
        manager
            .create_table(
                Table::create()
                    .table(Units::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Units::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Units::UnitName).string().not_null())
                    .col(ColumnDef::new(Units::NameKey).string().not_null())
                    .col(ColumnDef::new(Units::UnitCode).string().not_null())
                    .col(
                        ColumnDef::new(Units::IsSubscribed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Units::Url).string())
                    .col(
                        ColumnDef::new(Units::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Case-insensitive name lookups go through name_key
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_units_name_key")
                    .table(Units::Table)
                    .col(Units::NameKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create subscriptions table
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::LineUserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscriptions::UnitId).integer().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::RoomTypes)
                            .json()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Subscriptions::DeletedAt).timestamp())
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_line_user_id")
                            .from(Subscriptions::Table, Subscriptions::LineUserId)
                            .to(Users::Table, Users::LineUserId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_unit_id")
                            .from(Subscriptions::Table, Subscriptions::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (user, unit); soft delete reuses it
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscriptions_user_unit")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::LineUserId)
                    .col(Subscriptions::UnitId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Poller looks subscribers up by unit
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscriptions_unit_id")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UnitId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Units::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    LineUserId,
    IsPremium,
    ReplyToken,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Units {
    Table,
    Id,
    UnitName,
    NameKey,
    UnitCode,
    IsSubscribed,
    Url,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    LineUserId,
    UnitId,
    RoomTypes,
    DeletedAt,
    CreatedAt,
}
