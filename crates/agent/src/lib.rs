//! Cost optimizer agent
//!
//! HTTP surface and configuration for the `optimizer-agent` daemon.

pub mod api;
pub mod config;
