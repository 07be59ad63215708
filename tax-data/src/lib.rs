//! Loads transaction exports into a [`tax_core::TransactionRepository`].

mod loader;

pub use loader::{LoadSummary, TransactionCsvRecord, TransactionLoader, TransactionLoaderError};
