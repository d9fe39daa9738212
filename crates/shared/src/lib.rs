//! Shared configuration for Savora.
//!
//! This crate provides the configuration layer used by the binaries:
//! environment-driven settings for the database connection and reporting
//! defaults.

pub mod config;

pub use config::AppConfig;
