//! certgen: batch certificate generation from a participant table.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod notifier;
pub mod pipeline;
pub mod render;
pub mod table;
pub mod validate;
