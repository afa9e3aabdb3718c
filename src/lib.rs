//! Auto-update coordination server.
//!
//! Clients periodically POST their platform, running version and binary
//! checksum; the server answers with nothing (already current), a full
//! replacement binary URL, or a signed bsdiff delta that upgrades the
//! exact binary the client is running. A background poller keeps an
//! in-memory catalog of signed release assets in sync with an upstream
//! (GitHub-shaped) release feed.

pub mod api;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod fetch;
pub mod patch;
pub mod platform;
pub mod release;
pub mod resolver;
pub mod server;
pub mod signing;
