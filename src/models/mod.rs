//! Data models
//!
//! Database entities, validated service inputs and the raw request payloads
//! they are built from.

mod client;
mod summary;
mod time_entry;
mod transaction;
mod user;

pub use client::{Client, ClientPayload, CreateClientInput, UpdateClientInput};
pub use time_entry::{CreateTimeEntryInput, TimeEntry, TimeEntryPayload, UpdateTimeEntryInput};
pub use summary::LedgerSummary;
pub use transaction::{
    CreateTransactionInput, Transaction, TransactionPayload, UpdateTransactionInput,
};
pub use user::{User, UserProfile};
