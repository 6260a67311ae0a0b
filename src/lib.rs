pub mod auth;
pub mod backend;
pub mod billing;
pub mod cli;
pub mod config;
pub mod database;
pub mod invoice;
pub mod logging;
pub mod search;
