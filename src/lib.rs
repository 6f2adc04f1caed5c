//! Reconcile PostgreSQL users, groups and database privileges with a
//! declarative JSON or YAML file.

pub mod apply;
pub mod cli;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod list_users;
pub mod manager;
mod mutation;
pub mod quote;
pub mod statement;
pub mod sync;
pub mod validate;

pub use error::Error;
