pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod query;
pub mod remote;
pub mod runtime;
pub mod scope;
pub mod session;
