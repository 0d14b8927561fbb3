//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod client;
pub mod time_entry;
pub mod transaction;
pub mod user;

pub use client::{ClientRepository, SqlxClientRepository};
pub use time_entry::{SqlxTimeEntryRepository, TimeEntryRepository};
pub use transaction::{SqlxTransactionRepository, TransactionRepository};
pub use user::{is_unique_violation, SqlxUserRepository, UserRepository};
