//! SQLite storage for companies and their transaction line items.

mod column;
pub mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
