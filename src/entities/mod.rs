pub mod borrowing_record;
pub mod item;

pub use borrowing_record::{BorrowingStatus, Entity as BorrowingRecord};
pub use item::{Entity as Item, ItemStatus};
