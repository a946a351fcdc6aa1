//! # leadbot-cli
//!
//! The `leadbot` binary: serve the HTTP API, manage a tenant's knowledge
//! base, and run database migrations.

pub mod commands;
pub mod components;
pub mod config;

pub use config::{AppConfig, Cli, Command};
