//! Services layer - Business logic
//!
//! Services validate input, apply the bookkeeping rules and coordinate the
//! repositories. Every ledger operation takes the acting user's id and never
//! touches another user's rows.

pub mod client;
pub mod identity;
pub mod ledger;
pub mod password;
pub mod rate_limiter;
pub mod time_entry;
pub mod transaction;

pub use client::ClientService;
pub use identity::{Credentials, IdentityService, IdentityServiceError};
pub use ledger::{LedgerService, LedgerServiceError};
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use time_entry::TimeEntryService;
pub use transaction::TransactionService;
