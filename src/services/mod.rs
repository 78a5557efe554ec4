pub mod borrowing;
pub mod items;
pub mod ledger;
pub mod queries;
