//! taskbuddy - personal task manager library
//!
//! # Module Organization
//!
//! - `task`: Task model, statuses, categories, creation input and partial updates
//! - `filter`: Category, due-date and text filtering; grouping into board columns
//! - `optimistic`: Apply-then-settle mutations with rollback
//! - `controller`: The task list controller that owns the collection and its view
//! - `store`: Persistence collaborator trait plus JSON file and in-memory stores
//! - `session`: Sign-in/sign-out lifecycle and the persisted session
//! - `config`: Configuration loading from `taskbuddy.toml`
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface using clap
//! - `ui`: Terminal list and board views

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod optimistic;
pub mod session;
pub mod store;
pub mod task;
pub mod ui;

pub use error::{Error, Result};
