// ABOUTME: Library root for relaunch - exposes the update engine and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod container;
pub mod error;
pub mod output;
pub mod runtime;
pub mod schedule;
pub mod types;
pub mod update;
