//! FinTrack: a personal finance record keeper with multi-device sync.
//!
//! The crate is both the sync server (`fintrack-server`) and its CLI
//! client (`fintrack`). Records live in SQLite; clients synchronize by
//! pushing change batches and pulling timestamp-based deltas.

pub mod auth;
pub mod client;
pub mod commands;
pub mod config;
pub mod db;
pub mod models;
pub mod server;
pub mod sync;
