//! # VisionSprint
//!
//! HTTP API and admin CLI on top of `visionsprint-core`.

pub mod api;
pub mod cli;
pub mod config;
