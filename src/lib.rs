//! newsdesk: a terminal client for NewsAPI headlines and keyword search,
//! with favorites, search history and settings kept in a local SQLite file.
//!
//! - [`api`] - REST client, response classification, trending/latest split
//! - [`storage`] - SQLite tables and their data-access methods
//! - [`preferences`] - config defaults layered under stored settings
//! - [`app`] - state owned by one task, background work via `mpsc`
//! - [`view`] - plain-text rendering

pub mod api;
pub mod app;
pub mod config;
pub mod preferences;
pub mod storage;
pub mod util;
pub mod view;
