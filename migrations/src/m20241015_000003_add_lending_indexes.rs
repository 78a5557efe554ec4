use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Return lookup: newest approved record for an item
        manager
            .create_index(
                Index::create()
                    .name("idx_borrowing_records_item_status")
                    .table(BorrowingRecords::Table)
                    .col(BorrowingRecords::ItemId)
                    .col(BorrowingRecords::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_borrowing_records_created_at")
                    .table(BorrowingRecords::Table)
                    .col(BorrowingRecords::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_items_department")
                    .table(Items::Table)
                    .col(Items::Department)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_items_department")
                    .table(Items::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_borrowing_records_created_at")
                    .table(BorrowingRecords::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_borrowing_records_item_status")
                    .table(BorrowingRecords::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum BorrowingRecords {
    Table,
    ItemId,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Items {
    Table,
    Department,
}
