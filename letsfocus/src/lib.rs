//! Let's Focus client library: HTTP client, local task list model, and
//! view preferences.

pub mod client;
pub mod config;
pub mod tasks;
pub mod view;
