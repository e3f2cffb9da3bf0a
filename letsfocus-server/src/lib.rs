//! Let's Focus task server library.
//!
//! Exposes the HTTP service for use in tests and embedding. The server
//! authenticates callers by bearer session, keeps each owner's tasks in
//! a shared store and assigns manual order keys on reorder.

pub mod auth;
pub mod config;
pub mod error;
pub mod reorder;
pub mod server;
pub mod store;
