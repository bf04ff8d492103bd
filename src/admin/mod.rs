//! Interactive DynamoDB table administration.

pub mod catalog;
pub mod error;
pub mod repl;
pub mod session;

#[cfg(test)]
mod memory;

pub use catalog::{DynamoCatalog, TableCatalog};
pub use error::AdminError;
pub use session::{SelectedTable, Session};
