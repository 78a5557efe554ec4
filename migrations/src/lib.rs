pub use sea_orm_migration::prelude::*;

mod m20241001_000001_create_items_table;
mod m20241001_000002_create_borrowing_records_table;
mod m20241015_000003_add_lending_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241001_000001_create_items_table::Migration),
            Box::new(m20241001_000002_create_borrowing_records_table::Migration),
            Box::new(m20241015_000003_add_lending_indexes::Migration),
        ]
    }
}
