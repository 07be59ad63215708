pub mod factory;
pub mod repository;

pub use factory::{DEFAULT_CONNECTION_STRING, DbConfig, RepositoryFactory, RepositoryRegistry};
pub use repository::{RepositoryError, TransactionRepository};
