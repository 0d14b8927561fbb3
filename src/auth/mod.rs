//! Session authority
//!
//! Stateless session credentials for the bookkeeping API:
//! - `SessionAuthority::issue` mints a signed, time-bounded token for a user
//! - `SessionAuthority::verify` checks it without touching the identity store
//!
//! The only shared state is the immutable signing key loaded at startup, so a
//! single authority is shared behind an `Arc` by every request handler.

mod algorithm;
mod claims;
mod clock;
mod error;
mod key;
mod token;

pub use algorithm::Algorithm;
pub use claims::Claims;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigurationError, TokenError};
pub use key::{SigningKey, MIN_SECRET_LEN};
pub use token::{
    expiry_leeway, token_lifetime, SessionAuthority, SignedToken, DEFAULT_TOKEN_TTL_SECONDS,
    MAX_LEEWAY_SECONDS, MAX_TOKEN_TTL_SECONDS,
};
