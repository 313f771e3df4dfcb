//! Todo Board Client Library
//!
//! Typed client for the todo-list REST backend and the task store that sits
//! between it and a user interface.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod notifications;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;
