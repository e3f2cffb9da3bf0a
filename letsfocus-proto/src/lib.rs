//! Shared definitions for Let's Focus: the task model, manual ordering
//! rules, HTTP wire types and the store snapshot format.

pub mod api;
pub mod order;
pub mod snapshot;
pub mod task;
