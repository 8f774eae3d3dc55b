pub mod build;
pub mod check;
pub mod duplicates;
pub mod inventory;
