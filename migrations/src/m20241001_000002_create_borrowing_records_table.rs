use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No ON DELETE cascade: records are the audit trail and outlive item edits.
        manager
            .create_table(
                Table::create()
                    .table(BorrowingRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BorrowingRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::ItemId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::BorrowerName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::BorrowerEmail)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BorrowingRecords::Purpose).text().not_null())
                    .col(
                        ColumnDef::new(BorrowingRecords::ExpectedReturnDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::Department)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::ReturnDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::ReturnCondition)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BorrowingRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BorrowingRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BorrowingRecords {
    Table,
    Id,
    ItemId,
    BorrowerName,
    BorrowerEmail,
    Quantity,
    Purpose,
    ExpectedReturnDate,
    Department,
    Status,
    ReturnDate,
    ReturnCondition,
    CreatedAt,
    UpdatedAt,
}
