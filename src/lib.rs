//! Ledgerline - Freelancer bookkeeping with stateless signed sessions
//!
//! This library provides the session authority, the request gate and the
//! client, time entry and transaction services behind the HTTP API.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
